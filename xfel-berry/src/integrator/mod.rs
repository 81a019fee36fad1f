//! 方位角积分.
//!
//! 将二维探测器图像 (或图像栈) 按 `q` 等宽分箱, 得到径向平均强度曲线.

mod cache;
pub mod histogram;

use self::cache::RadiusMapCache;
use self::histogram::{reduce_frame, BinEdges, RadialHistogram};
use crate::error::{AlgoError, AlgoResult};
use crate::geometry::{GeometryParameters, RadiusMap};
use crate::pixel::Pixel;
use crate::Idx2d;
use ndarray::{Array1, Array2, ArrayView2, ArrayView3, ArrayViewD, Axis, Ix2, Ix3};
use std::fmt::Formatter;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 积分方法. 这是一个封闭集合, 新方法以新变体的形式加入, 调用方式不变.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IntegrationMethod {
    /// 等宽直方图.
    #[default]
    Histogram,
}

impl IntegrationMethod {
    /// 方法名.
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for IntegrationMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 按名称 (忽略大小写) 选择方法. 未知名称返回 `Err(AlgoError::InvalidArgument)`.
impl FromStr for IntegrationMethod {
    type Err = AlgoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "histogram" => Ok(Self::Histogram),
            other => Err(AlgoError::invalid(format!("未知的积分方法 `{other}`"))),
        }
    }
}

/// 单帧积分结果.
#[derive(Clone, Debug, PartialEq)]
pub struct IntegrationResult {
    /// `npt` 个 bin 中心 (1/m), 严格递增.
    pub centers: Array1<f64>,
    /// `npt` 个径向平均值. 像素数不足的 bin 为 NaN.
    pub profile: Array1<f64>,
}

/// 图像栈积分结果. 所有帧共享同一组 bin 中心.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchIntegrationResult {
    /// `npt` 个 bin 中心.
    pub centers: Array1<f64>,
    /// 形状为 `(frames, npt)`, 每行对应一帧.
    pub profiles: Array2<f64>,
}

impl BatchIntegrationResult {
    /// 帧数.
    #[inline]
    pub fn len(&self) -> usize {
        self.profiles.nrows()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 取出第 `index` 帧的积分结果. 越界时返回 `None`.
    pub fn frame(&self, index: usize) -> Option<IntegrationResult> {
        (index < self.len()).then(|| IntegrationResult {
            centers: self.centers.clone(),
            profile: self.profiles.row(index).to_owned(),
        })
    }
}

/// 带完整统计量的单帧积分结果.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileStats {
    /// bin 中心.
    pub centers: Array1<f64>,
    /// 均值.
    pub mean: Array1<f64>,
    /// 总体标准差.
    pub std: Array1<f64>,
    /// 有效像素数.
    pub counts: Array1<u64>,
}

/// 按维度分派后的积分结果.
#[derive(Clone, Debug, PartialEq)]
pub enum Integrated {
    /// 二维输入.
    Single(IntegrationResult),
    /// 三维输入.
    Batch(BatchIntegrationResult),
}

/// 方位角积分器.
///
/// 几何参数在构建后不可变. 积分器持有以图像形状为键的 q 映射缓存,
/// 形状改变时自动重建. 多个线程可以同时对同一个积分器调用积分方法.
pub struct AzimuthalIntegrator {
    geometry: GeometryParameters,
    cache: RadiusMapCache,
}

impl std::fmt::Debug for AzimuthalIntegrator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzimuthalIntegrator")
            .field("geometry", &self.geometry)
            .field("cached_shape", &self.cache.shape())
            .finish()
    }
}

/// 克隆时不复制缓存.
impl Clone for AzimuthalIntegrator {
    fn clone(&self) -> Self {
        Self::new(self.geometry)
    }
}

impl AzimuthalIntegrator {
    /// 由已校验的几何参数构建.
    pub fn new(geometry: GeometryParameters) -> Self {
        Self {
            geometry,
            cache: RadiusMapCache::default(),
        }
    }

    /// 由原始几何参数构建. 参数非法时返回 `Err(AlgoError::InvalidArgument)`.
    pub fn from_parameters(
        distance: f64,
        poni1: f64,
        poni2: f64,
        pixel1: f64,
        pixel2: f64,
        wavelength: f64,
    ) -> AlgoResult<Self> {
        GeometryParameters::new(distance, poni1, poni2, pixel1, pixel2, wavelength).map(Self::new)
    }

    /// 几何参数.
    #[inline]
    pub fn geometry(&self) -> &GeometryParameters {
        &self.geometry
    }

    /// 获取形状为 `shape` 的 q 映射. 必要时重建缓存.
    pub fn radius_map(&self, shape: Idx2d) -> Arc<RadiusMap> {
        self.cache
            .get_or_build(shape, || self.geometry.radius_map(shape))
    }

    /// 当前缓存的 q 映射形状.
    #[inline]
    pub fn cached_shape(&self) -> Option<Idx2d> {
        self.cache.shape()
    }

    /// 丢弃缓存的 q 映射.
    #[inline]
    pub fn clear_cache(&self) {
        self.cache.invalidate()
    }

    /// 对单帧图像做方位角积分.
    ///
    /// `npt` 为 bin 个数, 有效像素数少于 `min_count` 的 bin 输出 NaN.
    ///
    /// # 返回值
    ///
    /// - `npt == 0` 或图像为空时, 返回 `Err(AlgoError::InvalidArgument)`;
    /// - 图像中没有任何有效像素时, 返回 `Err(AlgoError::InsufficientData)`;
    /// - 其他情况下成功.
    pub fn integrate1d<T: Pixel>(
        &self,
        frame: ArrayView2<T>,
        npt: usize,
        min_count: usize,
        method: IntegrationMethod,
    ) -> AlgoResult<IntegrationResult> {
        let hist = self.histogram(frame, npt, method)?;
        Ok(IntegrationResult {
            centers: hist.centers(),
            profile: hist.means(min_count),
        })
    }

    /// 同 [`Self::integrate1d`], 但同时返回每个 bin 的标准差和像素数.
    pub fn integrate1d_stats<T: Pixel>(
        &self,
        frame: ArrayView2<T>,
        npt: usize,
        min_count: usize,
        method: IntegrationMethod,
    ) -> AlgoResult<ProfileStats> {
        let hist = self.histogram(frame, npt, method)?;
        Ok(ProfileStats {
            centers: hist.centers(),
            mean: hist.means(min_count),
            std: hist.stds(min_count),
            counts: hist.counts(),
        })
    }

    /// 对图像栈 (帧 × 行 × 列) 逐帧积分. 所有帧共享同一个 q 映射和 bin 中心.
    ///
    /// 任何一帧没有有效像素时, 整个调用返回 `Err(AlgoError::InsufficientData)`.
    pub fn integrate1d_batch<T: Pixel>(
        &self,
        stack: ArrayView3<T>,
        npt: usize,
        min_count: usize,
        method: IntegrationMethod,
    ) -> AlgoResult<BatchIntegrationResult> {
        let frames: Vec<ArrayView2<T>> = stack.axis_iter(Axis(0)).collect();
        self.integrate1d_frames(&frames, npt, min_count, method)
    }

    /// 同 [`Self::integrate1d_batch`], 但输入为帧的切片.
    ///
    /// 各帧形状必须与第一帧一致, 否则返回 `Err(AlgoError::ShapeMismatch)`.
    pub fn integrate1d_frames<T: Pixel>(
        &self,
        frames: &[ArrayView2<T>],
        npt: usize,
        min_count: usize,
        method: IntegrationMethod,
    ) -> AlgoResult<BatchIntegrationResult> {
        let Some(first) = frames.first() else {
            return Err(AlgoError::invalid("图像栈为空"));
        };
        let shape = first.dim();
        if let Some(bad) = frames.iter().find(|f| f.dim() != shape) {
            return Err(AlgoError::shape(&[shape.0, shape.1], bad.shape()));
        }
        Self::check_args(shape, npt, method)?;

        let map = self.radius_map(shape);
        let (lo, hi) = map.range();
        let edges = BinEdges::new(lo, hi, npt)?;
        let radius = map.view();
        let reduce = |f: &ArrayView2<T>| reduce_frame(radius, f.view(), edges);

        #[cfg(feature = "rayon")]
        let hists: Vec<RadialHistogram> = frames.par_iter().map(reduce).collect();
        #[cfg(not(feature = "rayon"))]
        let hists: Vec<RadialHistogram> = frames.iter().map(reduce).collect();

        if let Some(k) = hists.iter().position(|h| h.valid_count() == 0) {
            return Err(AlgoError::InsufficientData(format!("第 {k} 帧没有有效像素")));
        }

        let mut profiles = Array2::<f64>::zeros((hists.len(), npt));
        for (mut row, h) in profiles.outer_iter_mut().zip(hists.iter()) {
            row.assign(&h.means(min_count));
        }
        log::trace!("积分 {} 帧, npt = {npt}", hists.len());

        Ok(BatchIntegrationResult {
            centers: edges.centers(),
            profiles,
        })
    }

    /// 在边界处按维度分派: 二维为单帧, 三维为图像栈, 其它维度返回
    /// `Err(AlgoError::InvalidArgument)`.
    pub fn integrate1d_dyn<T: Pixel>(
        &self,
        src: ArrayViewD<T>,
        npt: usize,
        min_count: usize,
        method: IntegrationMethod,
    ) -> AlgoResult<Integrated> {
        match src.ndim() {
            2 => {
                let frame = src
                    .into_dimensionality::<Ix2>()
                    .map_err(|e| AlgoError::invalid(e.to_string()))?;
                self.integrate1d(frame, npt, min_count, method)
                    .map(Integrated::Single)
            }
            3 => {
                let stack = src
                    .into_dimensionality::<Ix3>()
                    .map_err(|e| AlgoError::invalid(e.to_string()))?;
                self.integrate1d_batch(stack, npt, min_count, method)
                    .map(Integrated::Batch)
            }
            n => Err(AlgoError::invalid(format!("只接受二维或三维输入, 实际为 {n} 维"))),
        }
    }

    /// 单帧的完整直方图.
    fn histogram<T: Pixel>(
        &self,
        frame: ArrayView2<T>,
        npt: usize,
        method: IntegrationMethod,
    ) -> AlgoResult<RadialHistogram> {
        Self::check_args(frame.dim(), npt, method)?;
        let map = self.radius_map(frame.dim());
        histogram1d(&map, frame, npt, method)
    }

    /// 与计算无关的参数检查.
    fn check_args(shape: Idx2d, npt: usize, method: IntegrationMethod) -> AlgoResult<()> {
        if npt == 0 {
            return Err(AlgoError::invalid("npt 必须至少为 1"));
        }
        if shape.0 == 0 || shape.1 == 0 {
            return Err(AlgoError::invalid(format!("图像为空, 形状 {shape:?}")));
        }
        match method {
            IntegrationMethod::Histogram => Ok(()),
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 以给定的 q 映射对单帧归约. 没有有效像素时返回 `Err(AlgoError::InsufficientData)`.
///
/// `map` 与 `frame` 的形状必须一致, 由调用者保证.
pub(crate) fn histogram1d<T: Pixel>(
    map: &RadiusMap,
    frame: ArrayView2<T>,
    npt: usize,
    method: IntegrationMethod,
) -> AlgoResult<RadialHistogram> {
    let (lo, hi) = map.range();
    let edges = BinEdges::new(lo, hi, npt)?;
    let hist = match method {
        IntegrationMethod::Histogram => reduce_frame(map.view(), frame, edges),
    };
    if hist.valid_count() == 0 {
        return Err(AlgoError::InsufficientData("图像没有有效像素".to_string()));
    }
    Ok(hist)
}
