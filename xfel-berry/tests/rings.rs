use log::LevelFilter;
use ndarray::Array2;
use simple_logger::SimpleLogger;
use xfel_berry::prelude::*;

const SHAPE: Idx2d = (96, 96);
const PIXEL: f64 = 1e-4;

fn init_logger() {
    let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
}

fn pattern() -> RingPattern {
    RingPattern::new(47.3, 45.8, &[10.0, 25.0, 40.0], 1.5).unwrap()
}

fn finder() -> ConcentricRingsFinder {
    ConcentricRingsFinder::new(PIXEL, PIXEL)
        .unwrap()
        .with_config(RingSearchConfig::default().with_npt(60))
        .unwrap()
}

fn distance(est: &CenterEstimate, (cx, cy): (f64, f64)) -> f64 {
    (est.cx - cx).hypot(est.cy - cy)
}

#[test]
fn test_search_seeded_at_truth() {
    init_logger();
    let p = pattern();
    let img = p.render(SHAPE);
    let (cx, cy) = p.center();
    let est = finder().search(img.view(), cx, cy, 1).unwrap();
    assert!(distance(&est, p.center()) < 1.0, "{est:?}");
}

#[test]
fn test_search_converges_from_offset_seed() {
    init_logger();
    let p = pattern();
    let img = p.render(SHAPE);
    let (cx, cy) = p.center();
    for (dx, dy) in [(3.0, -2.0), (-2.5, 2.5), (0.0, 3.0)] {
        let est = finder().search(img.view(), cx + dx, cy + dy, 1).unwrap();
        assert_eq!(est.status, SearchStatus::Improved);
        assert!(distance(&est, p.center()) < 1.0, "seed offset ({dx}, {dy}): {est:?}");
        assert!(est.into_result().is_ok());
    }
}

#[test]
fn test_search_integer_frame() {
    let p = pattern().with_levels(1000.0, 10.0);
    let img = p.render(SHAPE).mapv(|v| v.round() as u16);
    let (cx, cy) = p.center();
    let est = finder().search(img.view(), cx - 2.0, cy + 2.0, 1).unwrap();
    assert!(distance(&est, p.center()) < 1.0, "{est:?}");
}

#[test]
fn test_search_with_pre_smooth() {
    let p = pattern();
    let img = p.render(SHAPE);
    let (cx, cy) = p.center();
    let finder = ConcentricRingsFinder::new(PIXEL, PIXEL)
        .unwrap()
        .with_config(RingSearchConfig::default().with_npt(60).with_pre_smooth(3))
        .unwrap();
    let est = finder.search(img.view(), cx + 2.0, cy, 1).unwrap();
    assert!(distance(&est, p.center()) < 1.0, "{est:?}");
}

#[test]
fn test_flat_frame_is_soft_failure() {
    let img = Array2::<f64>::from_elem(SHAPE, 5.0);
    let est = finder().search(img.view(), 40.0, 50.0, 1).unwrap();
    assert_eq!(est.status, SearchStatus::NotImproved);
    assert_eq!((est.cx, est.cy), (40.0, 50.0));
    let err = est.into_result().unwrap_err();
    assert!(err.is_soft());
    assert!(matches!(
        err,
        AlgoError::ConvergenceFailure { cx, cy, .. } if (cx, cy) == (40.0, 50.0)
    ));
}

#[test]
fn test_all_nan_frame() {
    let img = Array2::<f32>::from_elem(SHAPE, f32::NAN);
    assert!(matches!(
        finder().search(img.view(), 48.0, 48.0, 1),
        Err(AlgoError::InsufficientData(_))
    ));
}

#[test]
fn test_integrate_at_truth_is_sharper() {
    let p = pattern();
    let img = p.render(SHAPE);
    let (cx, cy) = p.center();
    let f = finder();
    let sharp = f.integrate(img.view(), cx, cy, 1).unwrap();
    let blurred = f.integrate(img.view(), cx + 4.0, cy - 3.0, 1).unwrap();
    let peak = |r: &IntegrationResult| r.profile.iter().copied().fold(f64::MIN, f64::max);
    assert!(peak(&sharp) > peak(&blurred));
}
