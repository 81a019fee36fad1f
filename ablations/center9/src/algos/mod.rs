mod profile;

use utils::loader::RingCase;
use xfel_berry::consts::integ::MIN_COUNT;
use xfel_berry::prelude::*;

pub use profile::Profile;

/// 参与比较的搜索参数.
pub const VARIANTS: [(&str, fn() -> RingSearchConfig); 4] = [
    ("baseline", baseline),
    ("fixed-npt", fixed_npt),
    ("pre-smooth", pre_smooth),
    ("fine-step", fine_step),
];

/// 默认参数: bin 个数由初始猜测估计.
fn baseline() -> RingSearchConfig {
    RingSearchConfig::default()
}

/// 每像素一个 bin.
fn fixed_npt() -> RingSearchConfig {
    RingSearchConfig::default().with_npt(90)
}

/// 搜索前先做一次 3 × 3 高斯平滑.
fn pre_smooth() -> RingSearchConfig {
    RingSearchConfig::default().with_pre_smooth(3)
}

/// 更小的终止步长.
fn fine_step() -> RingSearchConfig {
    RingSearchConfig::default().with_steps(2.0, 0.01)
}

/// 以 `config` 在全部样本上运行搜索.
pub fn run_variant(name: &str, config: RingSearchConfig, cases: &[RingCase]) -> Profile {
    let mut profile = Profile::new();
    let finder = match utils::square_pixel_finder().with_config(config) {
        Ok(f) => f,
        Err(e) => {
            log::error!("{name}: 非法的搜索参数: {e}");
            return profile.finish();
        }
    };

    for case in cases {
        let (cx0, cy0) = case.seed;
        profile.search_start();
        let est = finder
            .search(case.frame.view(), cx0, cy0, MIN_COUNT)
            .and_then(CenterEstimate::into_result);
        profile.search_elapsed();

        match est {
            Ok(est) => {
                let error = case.error_of(est.cx, est.cy);
                log::debug!("{name}: 样本 {} 误差 {error:.3} px", case.index);
                profile.count_improved(error, est.iterations);
            }
            Err(e) => {
                log::warn!("{name}: 样本 {} 搜索失败: {e}", case.index);
                profile.count_failed();
            }
        }
    }
    profile.finish()
}
