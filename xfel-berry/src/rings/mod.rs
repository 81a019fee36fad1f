//! 同心环中心搜索.
//!
//! 对一帧包含同心环 (如标定样品衍射环) 的图像, 以候选中心做方位角积分,
//! 并以径向曲线的锐度作为目标函数. 中心越准, 各个环在径向上越集中, 曲线峰越尖锐.
//!
//! 目标函数由离散分箱定义, 不光滑也没有梯度. 因此使用无导数的模式搜索:
//!
//! 1. 以当前最优点为中心, 按当前步长探测 8 个方向 (上下左右及对角);
//! 2. 若存在严格更优的点则移动过去, 否则将步长乘以收缩系数;
//! 3. 步长小于终止步长或用完迭代次数时停止, 返回搜索过程中最优的点.

mod score;

use crate::consts::rings;
use crate::error::{AlgoError, AlgoResult};
use crate::geometry::GeometryParameters;
use crate::integrator::histogram::RadialHistogram;
use crate::integrator::{histogram1d, IntegrationMethod, IntegrationResult};
use crate::pixel::Pixel;
use crate::smooth::gaussian_blur;
use crate::Idx2d;
use ndarray::{Array2, ArrayView2};
use ordered_float::OrderedFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use score::sharpness;

/// 8 个探测方向 `(dx, dy)`.
const PROBES: [(f64, f64); 8] = [
    (-1.0, -1.0),
    (0.0, -1.0),
    (1.0, -1.0),
    (-1.0, 0.0),
    (1.0, 0.0),
    (-1.0, 1.0),
    (0.0, 1.0),
    (1.0, 1.0),
];

/// 模式搜索参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RingSearchConfig {
    /// 固定的 bin 个数. `None` 表示由初始中心到最远图像角的像素距离估计.
    npt: Option<usize>,

    /// 初始步长 (像素).
    initial_step: f64,

    /// 终止步长 (像素).
    min_step: f64,

    /// 步长收缩系数, `(0, 1)`.
    shrink: f64,

    /// 最大迭代次数, 每次迭代探测 8 个候选点.
    max_iterations: u32,

    /// 搜索前用该尺寸的高斯核平滑图像一次. `None` 表示不平滑.
    pre_smooth: Option<usize>,
}

impl Default for RingSearchConfig {
    fn default() -> Self {
        Self {
            npt: None,
            initial_step: rings::INITIAL_STEP,
            min_step: rings::MIN_STEP,
            shrink: rings::SHRINK,
            max_iterations: rings::MAX_ITERATIONS,
            pre_smooth: None,
        }
    }
}

impl RingSearchConfig {
    /// 使用固定的 bin 个数.
    #[inline]
    pub fn with_npt(mut self, npt: usize) -> Self {
        self.npt = Some(npt);
        self
    }

    /// 设置初始步长与终止步长.
    #[inline]
    pub fn with_steps(mut self, initial_step: f64, min_step: f64) -> Self {
        self.initial_step = initial_step;
        self.min_step = min_step;
        self
    }

    /// 设置步长收缩系数.
    #[inline]
    pub fn with_shrink(mut self, shrink: f64) -> Self {
        self.shrink = shrink;
        self
    }

    /// 设置最大迭代次数.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// 搜索前以 `kernel_size` 的高斯核平滑图像.
    #[inline]
    pub fn with_pre_smooth(mut self, kernel_size: usize) -> Self {
        self.pre_smooth = Some(kernel_size);
        self
    }

    /// 固定的 bin 个数.
    #[inline]
    pub fn npt(&self) -> Option<usize> {
        self.npt
    }

    /// 最大迭代次数.
    #[inline]
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// 检查参数合法性. 非法时返回 `Err(AlgoError::InvalidArgument)`.
    pub fn validate(&self) -> AlgoResult<()> {
        if self.npt == Some(0) {
            return Err(AlgoError::invalid("npt 必须至少为 1"));
        }
        if !(self.min_step.is_finite() && self.min_step > 0.0) {
            return Err(AlgoError::invalid(format!("终止步长必须为正, 实际为 {}", self.min_step)));
        }
        if !(self.initial_step.is_finite() && self.initial_step >= self.min_step) {
            return Err(AlgoError::invalid(format!(
                "初始步长 {} 不能小于终止步长 {}",
                self.initial_step, self.min_step
            )));
        }
        if !(0.0 < self.shrink && self.shrink < 1.0) {
            return Err(AlgoError::invalid(format!("收缩系数必须在 (0, 1) 内, 实际为 {}", self.shrink)));
        }
        if self.max_iterations == 0 {
            return Err(AlgoError::invalid("最大迭代次数必须为正"));
        }
        if let Some(k) = self.pre_smooth {
            if k % 2 == 0 {
                return Err(AlgoError::invalid(format!("平滑核尺寸必须为奇数, 实际为 {k}")));
            }
        }
        Ok(())
    }
}

/// 搜索是否改进了初始猜测.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SearchStatus {
    /// 找到了严格优于初始猜测的中心.
    Improved,

    /// 没有任何候选点优于初始猜测. 返回的中心即初始猜测.
    NotImproved,
}

/// 中心估计. `cx` 为列方向像素坐标, `cy` 为行方向像素坐标.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CenterEstimate {
    /// 列方向坐标.
    pub cx: f64,
    /// 行方向坐标.
    pub cy: f64,
    /// 该中心的锐度得分.
    pub score: f64,
    /// 实际迭代次数.
    pub iterations: u32,
    /// 搜索状态.
    pub status: SearchStatus,
}

impl CenterEstimate {
    /// 是否改进了初始猜测.
    #[inline]
    pub fn is_improved(&self) -> bool {
        matches!(self.status, SearchStatus::Improved)
    }

    /// 将未改进的搜索转换为 `Err(AlgoError::ConvergenceFailure)`, 错误中携带最佳估计.
    pub fn into_result(self) -> AlgoResult<Self> {
        match self.status {
            SearchStatus::Improved => Ok(self),
            SearchStatus::NotImproved => Err(AlgoError::ConvergenceFailure {
                cx: self.cx,
                cy: self.cy,
                score: self.score,
            }),
        }
    }
}

/// 同心环中心搜索器.
#[derive(Copy, Clone, Debug)]
pub struct ConcentricRingsFinder {
    pixel_x: f64,
    pixel_y: f64,
    config: RingSearchConfig,
}

impl ConcentricRingsFinder {
    /// 以列方向像素尺寸 `pixel_x` 与行方向像素尺寸 `pixel_y` 构建搜索器, 使用默认搜索参数.
    ///
    /// 像素尺寸不是正的有限值时返回 `Err(AlgoError::InvalidArgument)`.
    pub fn new(pixel_x: f64, pixel_y: f64) -> AlgoResult<Self> {
        // 借用几何参数的检查规则.
        GeometryParameters::from_pixel_center(0.0, 0.0, pixel_x, pixel_y)?;
        Ok(Self {
            pixel_x,
            pixel_y,
            config: RingSearchConfig::default(),
        })
    }

    /// 替换搜索参数. 参数非法时返回 `Err(AlgoError::InvalidArgument)`.
    pub fn with_config(mut self, config: RingSearchConfig) -> AlgoResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// 搜索参数.
    #[inline]
    pub fn config(&self) -> &RingSearchConfig {
        &self.config
    }

    /// 以显式中心 `(cx, cy)` 积分. 每次调用都会为该中心重新计算 q 映射, 不使用缓存.
    ///
    /// bin 个数取自搜索参数, 未指定时由中心到最远图像角的距离估计.
    pub fn integrate<T: Pixel>(
        &self,
        frame: ArrayView2<T>,
        cx: f64,
        cy: f64,
        min_count: usize,
    ) -> AlgoResult<IntegrationResult> {
        Self::check_frame(frame.dim())?;
        let npt = self.npt_for(frame.dim(), cx, cy);
        let hist = self.histogram(frame, cx, cy, npt)?;
        Ok(IntegrationResult {
            centers: hist.centers(),
            profile: hist.means(min_count),
        })
    }

    /// 从初始猜测 `(cx0, cy0)` 出发搜索同心环中心.
    ///
    /// # 返回值
    ///
    /// - 图像为空或初始猜测不是有限值时, 返回 `Err(AlgoError::InvalidArgument)`;
    /// - 图像没有有效像素时, 返回 `Err(AlgoError::InsufficientData)`;
    /// - 其他情况下返回最优的中心估计. 没能改进初始猜测时状态为
    ///   [`SearchStatus::NotImproved`], 调用者可以通过 [`CenterEstimate::into_result`]
    ///   将其视为错误.
    pub fn search<T: Pixel>(
        &self,
        frame: ArrayView2<T>,
        cx0: f64,
        cy0: f64,
        min_count: usize,
    ) -> AlgoResult<CenterEstimate> {
        Self::check_frame(frame.dim())?;
        if !(cx0.is_finite() && cy0.is_finite()) {
            return Err(AlgoError::invalid(format!("初始猜测 ({cx0}, {cy0}) 不是有限值")));
        }

        let smoothed = self.prepare(frame)?;
        let view = smoothed.view();
        // 整个搜索使用同一个 bin 个数, 保证各候选点得分可比.
        let npt = self.npt_for(view.dim(), cx0, cy0);
        let eval = |cx: f64, cy: f64| -> AlgoResult<f64> {
            let hist = self.histogram(view, cx, cy, npt)?;
            Ok(sharpness(hist.means(min_count).view()))
        };

        let (mut cx, mut cy) = (cx0, cy0);
        let mut best = eval(cx, cy)?;
        let mut step = self.config.initial_step;
        let mut iterations = 0;
        let mut improved = false;

        while step >= self.config.min_step && iterations < self.config.max_iterations {
            iterations += 1;
            let candidates = PROBES.map(|(dx, dy)| (cx + dx * step, cy + dy * step));

            #[cfg(feature = "rayon")]
            let scored: Vec<(f64, f64, f64)> = candidates
                .par_iter()
                .map(|&(x, y)| eval(x, y).map(|s| (x, y, s)))
                .collect::<AlgoResult<_>>()?;
            #[cfg(not(feature = "rayon"))]
            let scored: Vec<(f64, f64, f64)> = candidates
                .iter()
                .map(|&(x, y)| eval(x, y).map(|s| (x, y, s)))
                .collect::<AlgoResult<_>>()?;

            // 并列时取探测顺序中靠前者, 保证结果确定.
            let top = scored
                .iter()
                .copied()
                .rev()
                .max_by_key(|&(_, _, s)| OrderedFloat(s));
            match top {
                Some((x, y, s)) if s > best => {
                    log::trace!("第 {iterations} 次迭代: ({x:.3}, {y:.3}) 得分 {s:.6}, 步长 {step}");
                    (cx, cy, best) = (x, y, s);
                    improved = true;
                }
                _ => step *= self.config.shrink,
            }
        }

        let status = if improved {
            SearchStatus::Improved
        } else {
            log::warn!("同心环搜索未能改进初始猜测 ({cx0:.3}, {cy0:.3})");
            SearchStatus::NotImproved
        };
        log::debug!("同心环中心 ({cx:.3}, {cy:.3}), 得分 {best:.6}, 迭代 {iterations} 次");

        Ok(CenterEstimate {
            cx,
            cy,
            score: best,
            iterations,
            status,
        })
    }

    /// 拓宽为 `f64`, 必要时预先平滑.
    fn prepare<T: Pixel>(&self, frame: ArrayView2<T>) -> AlgoResult<Array2<f64>> {
        let widened = frame.mapv(|v| if v.is_valid() { v.widen() } else { f64::NAN });
        match self.config.pre_smooth {
            None | Some(1) => Ok(widened),
            Some(k) => {
                let mut dst = Array2::<f64>::zeros(widened.dim());
                gaussian_blur(widened.view(), dst.view_mut(), k, 0.0)?;
                Ok(dst)
            }
        }
    }

    /// 以 `(cx, cy)` 为中心的直方图.
    fn histogram<T: Pixel>(
        &self,
        frame: ArrayView2<T>,
        cx: f64,
        cy: f64,
        npt: usize,
    ) -> AlgoResult<RadialHistogram> {
        let geometry = GeometryParameters::from_pixel_center(cx, cy, self.pixel_x, self.pixel_y)?;
        let map = geometry.radius_map(frame.dim());
        histogram1d(&map, frame, npt, IntegrationMethod::Histogram)
    }

    /// 搜索使用的 bin 个数.
    fn npt_for(&self, shape: Idx2d, cx: f64, cy: f64) -> usize {
        self.config.npt.unwrap_or_else(|| estimate_npt(shape, cx, cy))
    }

    fn check_frame(shape: Idx2d) -> AlgoResult<()> {
        if shape.0 == 0 || shape.1 == 0 {
            return Err(AlgoError::invalid(format!("图像为空, 形状 {shape:?}")));
        }
        Ok(())
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 由图像覆盖的径向跨度估计 bin 个数: 约每两个像素一个 bin.
///
/// 跨度为中心 `(cx, cy)` 到最远图像角与到图像最近点的像素距离之差, 不超过图像对角线.
/// 因此中心远在图像之外时, bin 个数仍然有界.
fn estimate_npt((rows, cols): Idx2d, cx: f64, cy: f64) -> usize {
    let (h, w) = ((rows - 1) as f64, (cols - 1) as f64);
    let far = [(0.0, 0.0), (0.0, w), (h, 0.0), (h, w)]
        .into_iter()
        .map(|(y, x)| (x - cx).hypot(y - cy))
        .fold(0.0f64, f64::max);
    let near = (cx.clamp(0.0, w) - cx).hypot(cy.clamp(0.0, h) - cy);
    let span = (far - near).clamp(0.0, w.hypot(h));
    ((span / 2.0).ceil() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::{estimate_npt, ConcentricRingsFinder, RingSearchConfig, SearchStatus};
    use crate::error::AlgoError;
    use ndarray::Array2;

    #[test]
    fn test_finder_init_err() {
        assert!(ConcentricRingsFinder::new(0.0, 1e-4).is_err());
        assert!(ConcentricRingsFinder::new(1e-4, f64::NAN).is_err());
        let f = ConcentricRingsFinder::new(2e-4, 1e-4).unwrap();
        let bad = [
            RingSearchConfig::default().with_npt(0),
            RingSearchConfig::default().with_steps(0.01, 0.1),
            RingSearchConfig::default().with_steps(1.0, 0.0),
            RingSearchConfig::default().with_shrink(1.0),
            RingSearchConfig::default().with_max_iterations(0),
            RingSearchConfig::default().with_pre_smooth(4),
        ];
        for c in bad {
            assert!(matches!(f.with_config(c), Err(AlgoError::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_estimate_npt() {
        // 中心位于 (0, 0), 最远角 (3, 4) 距离为 5.
        assert_eq!(estimate_npt((4, 5), 0.0, 0.0), 3);
        assert_eq!(estimate_npt((1, 1), 0.0, 0.0), 1);
        // 中心在图像外: 跨度为 hypot(4, 13) - 10.
        assert_eq!(estimate_npt((4, 5), 0.0, -10.0), 2);
        // 中心远在图像之外时, 跨度不超过对角线 5.
        assert!((1..=3).contains(&estimate_npt((4, 5), 1e18, 0.0)));
        assert!((1..=3).contains(&estimate_npt((4, 5), 0.0, -1e300)));
    }

    /// 中心远在图像之外时不会按距离分配 bin.
    #[test]
    fn test_far_center() {
        let src = Array2::<f64>::ones((16, 16));
        let finder = ConcentricRingsFinder::new(1.0, 1.0).unwrap();
        let ret = finder.integrate(src.view(), 1e18, 0.0, 1).unwrap();
        assert!(ret.profile.len() <= 12);
        assert!(ret.profile.iter().filter(|v| !v.is_nan()).all(|&v| v == 1.0));

        let est = finder.search(src.view(), -1e12, 1e12, 1).unwrap();
        assert_eq!(est.status, SearchStatus::NotImproved);
    }

    /// 平坦图像没有任何环, 搜索不可能改进初始猜测.
    #[test]
    fn test_flat_image_not_improved() {
        let src = Array2::<f64>::ones((16, 128));
        let finder = ConcentricRingsFinder::new(2e-4, 1e-4).unwrap();
        let est = finder.search(src.view(), 128.0, -6.0, 1).unwrap();
        assert_eq!(est.status, SearchStatus::NotImproved);
        assert_eq!((est.cx, est.cy), (128.0, -6.0));
        assert!(matches!(
            est.into_result(),
            Err(AlgoError::ConvergenceFailure { .. })
        ));
    }

    #[test]
    fn test_search_invalid_seed() {
        let src = Array2::<f64>::ones((8, 8));
        let finder = ConcentricRingsFinder::new(1.0, 1.0).unwrap();
        assert!(finder.search(src.view(), f64::NAN, 0.0, 1).is_err());
        let empty = Array2::<f64>::ones((0, 8));
        assert!(finder.search(empty.view(), 0.0, 0.0, 1).is_err());
    }

    #[test]
    fn test_integrate_explicit_center() {
        let src = Array2::<u16>::from_elem((20, 30), 7);
        let finder = ConcentricRingsFinder::new(1e-4, 1e-4)
            .unwrap()
            .with_config(RingSearchConfig::default().with_npt(6))
            .unwrap();
        let ret = finder.integrate(src.view(), 15.0, 10.0, 1).unwrap();
        assert_eq!(ret.profile.len(), 6);
        assert!(ret.profile.iter().all(|&v| v == 7.0));
        // 中心落在像素上时最小 q 为 0.
        assert!(ret.centers[0] > 0.0);
        assert!(ret.centers.windows(2).into_iter().all(|w| w[0] < w[1]));
    }
}
