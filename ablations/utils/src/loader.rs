//! 合成同心环图像加载器. 代替真实探测器数据, 每个样本都带有已知的真实中心.

use ndarray::Array2;
use std::env;
use xfel_berry::synth::RingPattern;
use xfel_berry::Idx2d;

/// 默认样本数.
const DEFAULT_CASES: usize = 32;

/// 合成图像尺寸.
pub const SHAPE: Idx2d = (128, 128);

/// 一个带真值的样本.
#[derive(Clone, Debug)]
pub struct RingCase {
    /// 样本编号.
    pub index: usize,
    /// 图像.
    pub frame: Array2<f64>,
    /// 真实中心 `(cx, cy)`.
    pub truth: (f64, f64),
    /// 搜索的初始猜测 `(cx, cy)`.
    pub seed: (f64, f64),
}

impl RingCase {
    /// 估计值与真值之间的像素距离.
    #[inline]
    pub fn error_of(&self, cx: f64, cy: f64) -> f64 {
        (cx - self.truth.0).hypot(cy - self.truth.1)
    }
}

/// 获取样本数.
///
/// 1. 若环境变量 `$CENTER9_CASES` 是正整数, 则返回其值;
/// 2. 否则, 返回 32.
pub fn case_count_from_env_or_default() -> usize {
    env::var("CENTER9_CASES")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_CASES)
}

/// 第 `index` 个样本. 中心在图像中央附近按固定规律偏移, 初始猜测偏离真值 2~4 个像素.
pub fn ring_case(index: usize) -> RingCase {
    let k = index as f64;
    let truth = (
        60.0 + 7.0 * (0.7 * k).sin() + 0.37,
        62.0 + 7.0 * (1.3 * k).cos() - 0.21,
    );
    let angle = 2.4 * k;
    let offset = 2.0 + (index % 3) as f64;
    let seed = (
        truth.0 + offset * angle.cos(),
        truth.1 + offset * angle.sin(),
    );

    let radii = [12.0, 27.0 + (index % 4) as f64, 44.0];
    let frame = match RingPattern::new(truth.0, truth.1, &radii, 1.2 + 0.1 * (index % 5) as f64) {
        Ok(p) => p.render(SHAPE),
        Err(e) => unreachable!("{e}"),
    };

    RingCase {
        index,
        frame,
        truth,
        seed,
    }
}

/// 前 `n` 个样本.
pub fn ring_cases(n: usize) -> impl Iterator<Item = RingCase> {
    (0..n).map(ring_case)
}

/// 从 `$CENTER9_CASES` 决定样本数并加载全部样本.
#[inline]
pub fn ring_cases_from_env_or_default() -> Vec<RingCase> {
    ring_cases(case_count_from_env_or_default()).collect()
}
