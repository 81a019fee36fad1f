//! 径向直方图归约.
//!
//! 给定一帧中每个像素的 `(q, 强度)`, 将 `[min(q), max(q)]` 等宽划分为 `npt` 个 bin,
//! 并累加每个 bin 的 `count / sum / m2`.
//!
//! 累加满足交换律与结合律, 因此可以先按行分块得到部分直方图, 再按固定顺序合并.
//! 分块只取决于图像形状, 合并顺序固定, 因此无论是否开启 `rayon`, 结果都逐位一致.

use crate::consts::integ::{MAX_TASKS, MIN_ROWS_PER_TASK};
use crate::error::{AlgoError, AlgoResult};
use crate::pixel::Pixel;
use ndarray::{Array1, ArrayView2, Axis, Zip};

/// 单个 bin 的累加量.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RadialBin {
    /// 有效像素数.
    pub count: u64,
    /// 强度之和.
    pub sum: f64,
    /// 强度相对均值的偏差平方和.
    pub m2: f64,
}

impl RadialBin {
    /// 累加一个强度值 (Welford 递推).
    #[inline]
    pub fn push(&mut self, v: f64) {
        if self.count == 0 {
            *self = Self {
                count: 1,
                sum: v,
                m2: 0.0,
            };
            return;
        }
        let old_mean = self.sum / self.count as f64;
        self.count += 1;
        self.sum += v;
        let new_mean = self.sum / self.count as f64;
        self.m2 += (v - old_mean) * (v - new_mean);
    }

    /// 合并另一个 bin 的累加量.
    #[inline]
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let (na, nb) = (self.count as f64, other.count as f64);
        let delta = other.sum / nb - self.sum / na;
        self.m2 += other.m2 + delta * delta * (na * nb / (na + nb));
        self.count += other.count;
        self.sum += other.sum;
    }

    /// 是否满足最少像素数要求. 空 bin 永远无效.
    #[inline]
    pub fn is_valid(&self, min_count: usize) -> bool {
        self.count > 0 && self.count >= min_count as u64
    }

    /// 均值. 不满足 `min_count` 时为 NaN.
    #[inline]
    pub fn mean(&self, min_count: usize) -> f64 {
        if self.is_valid(min_count) {
            self.sum / self.count as f64
        } else {
            f64::NAN
        }
    }

    /// 总体标准差. 不满足 `min_count` 时为 NaN.
    pub fn std(&self, min_count: usize) -> f64 {
        if !self.is_valid(min_count) {
            return f64::NAN;
        }
        // 舍入误差可能让 m2 略小于 0.
        (self.m2 / self.count as f64).max(0.0).sqrt()
    }
}

/// `[min, max]` 上的 `npt` 个等宽 bin.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BinEdges {
    min: f64,
    max: f64,
    npt: usize,
}

impl BinEdges {
    /// 构建等宽 bin.
    ///
    /// `npt` 必须为正, `min` 与 `max` 必须是满足 `min <= max` 的有限值,
    /// 否则返回 `Err(AlgoError::InvalidArgument)`.
    pub fn new(min: f64, max: f64, npt: usize) -> AlgoResult<Self> {
        if npt == 0 {
            return Err(AlgoError::invalid("npt 必须至少为 1"));
        }
        if !(min.is_finite() && max.is_finite() && min <= max) {
            return Err(AlgoError::invalid(format!("非法的分箱区间 [{min}, {max}]")));
        }
        Ok(Self { min, max, npt })
    }

    /// bin 个数.
    #[inline]
    pub fn npt(&self) -> usize {
        self.npt
    }

    /// 区间 `(min, max)`.
    #[inline]
    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// `r` 所在的 bin. 区间外 (及 NaN) 返回 `None`, `r == max` 归入最后一个 bin.
    #[inline]
    pub fn index_of(&self, r: f64) -> Option<usize> {
        if !(self.min <= r && r <= self.max) {
            return None;
        }
        let width = self.max - self.min;
        if width == 0.0 {
            return Some(0);
        }
        let idx = ((r - self.min) / width * self.npt as f64) as usize;
        Some(idx.min(self.npt - 1))
    }

    /// `npt + 1` 个边界. 首尾精确等于 `min` 和 `max`.
    pub fn edges(&self) -> Array1<f64> {
        let step = (self.max - self.min) / self.npt as f64;
        let mut edges = Array1::from_shape_fn(self.npt + 1, |k| self.min + k as f64 * step);
        edges[self.npt] = self.max;
        edges
    }

    /// `npt` 个 bin 中心, 即相邻边界的中点.
    pub fn centers(&self) -> Array1<f64> {
        let edges = self.edges();
        Array1::from_shape_fn(self.npt, |k| 0.5 * (edges[k] + edges[k + 1]))
    }
}

/// 一帧图像的径向直方图.
#[derive(Clone, Debug)]
pub struct RadialHistogram {
    edges: BinEdges,
    bins: Vec<RadialBin>,
}

impl RadialHistogram {
    /// 创建全空直方图.
    pub fn new(edges: BinEdges) -> Self {
        Self {
            edges,
            bins: vec![RadialBin::default(); edges.npt()],
        }
    }

    /// 分箱规则.
    #[inline]
    pub fn edges(&self) -> &BinEdges {
        &self.edges
    }

    /// 所有 bin.
    #[inline]
    pub fn bins(&self) -> &[RadialBin] {
        &self.bins
    }

    /// 累加一个像素. 无效像素与区间外的像素被忽略.
    #[inline]
    pub fn push<T: Pixel>(&mut self, r: f64, v: T) {
        if !v.is_valid() {
            return;
        }
        if let Some(k) = self.edges.index_of(r) {
            self.bins[k].push(v.widen());
        }
    }

    /// 累加 `radius` 与 `frame` 中逐一对应的像素.
    ///
    /// 如果两者形状不一致, 则程序 panic.
    pub fn accumulate<T: Pixel>(&mut self, radius: ArrayView2<f64>, frame: ArrayView2<T>) {
        Zip::from(radius)
            .and(frame)
            .for_each(|&r, &v| self.push(r, v));
    }

    /// 合并两个分箱规则相同的直方图.
    pub fn merge(mut self, other: Self) -> Self {
        debug_assert_eq!(self.edges, other.edges, "分箱规则不一致");
        for (a, b) in self.bins.iter_mut().zip(other.bins.iter()) {
            a.merge(b);
        }
        self
    }

    /// 有效像素总数.
    pub fn valid_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }

    /// bin 中心.
    #[inline]
    pub fn centers(&self) -> Array1<f64> {
        self.edges.centers()
    }

    /// 每个 bin 的均值, 不满足 `min_count` 的 bin 为 NaN.
    pub fn means(&self, min_count: usize) -> Array1<f64> {
        self.bins.iter().map(|b| b.mean(min_count)).collect()
    }

    /// 每个 bin 的标准差, 不满足 `min_count` 的 bin 为 NaN.
    pub fn stds(&self, min_count: usize) -> Array1<f64> {
        self.bins.iter().map(|b| b.std(min_count)).collect()
    }

    /// 每个 bin 的有效像素数.
    pub fn counts(&self) -> Array1<u64> {
        self.bins.iter().map(|b| b.count).collect()
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 每个任务处理的行数. 至少 [`MIN_ROWS_PER_TASK`] 行, 且任务数不超过 [`MAX_TASKS`].
#[inline]
fn rows_per_task(rows: usize) -> usize {
    MIN_ROWS_PER_TASK.max(rows.div_ceil(MAX_TASKS))
}

/// 对一帧图像做径向直方图归约.
///
/// 按行分块, 每块得到一个部分直方图后按块顺序合并. 块数不超过 [`MAX_TASKS`],
/// 因此部分直方图占用的内存与图像行数无关. 开启 `rayon` feature 时各块并行累加.
///
/// 如果 `radius` 与 `frame` 形状不一致, 则程序 panic. 上层负责提前检查.
pub fn reduce_frame<T: Pixel>(
    radius: ArrayView2<f64>,
    frame: ArrayView2<T>,
    edges: BinEdges,
) -> RadialHistogram {
    assert_eq!(radius.dim(), frame.dim(), "q 映射与图像形状不一致");

    let partial = |(r, f): (ArrayView2<f64>, ArrayView2<T>)| {
        let mut h = RadialHistogram::new(edges);
        h.accumulate(r, f);
        h
    };
    let task_rows = rows_per_task(radius.nrows());
    let r_chunks = radius.axis_chunks_iter(Axis(0), task_rows);
    let f_chunks = frame.axis_chunks_iter(Axis(0), task_rows);

    #[cfg(feature = "rayon")]
    let partials: Vec<RadialHistogram> = r_chunks
        .into_par_iter()
        .zip(f_chunks.into_par_iter())
        .map(partial)
        .collect();
    #[cfg(not(feature = "rayon"))]
    let partials: Vec<RadialHistogram> = r_chunks.zip(f_chunks).map(partial).collect();

    partials
        .into_iter()
        .fold(RadialHistogram::new(edges), RadialHistogram::merge)
}
