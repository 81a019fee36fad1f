use crate::Idx2d;
use itertools::{Itertools, MinMaxResult};
use ndarray::{Array2, ArrayView2};

/// 每个像素对应的动量转移 `q`, 及其取值范围.
///
/// 由 [`super::GeometryParameters::radius_map`] 构建. 形状是其唯一的缓存键.
#[derive(Clone, Debug)]
pub struct RadiusMap {
    data: Array2<f64>,
    min: f64,
    max: f64,
}

impl RadiusMap {
    pub(crate) fn new(data: Array2<f64>) -> Self {
        let (min, max) = match data.iter().copied().minmax() {
            MinMaxResult::NoElements => (0.0, 0.0),
            MinMaxResult::OneElement(v) => (v, v),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        };
        Self { data, min, max }
    }

    /// 图像形状 `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 底层数据的只读视图.
    #[inline]
    pub fn view(&self) -> ArrayView2<f64> {
        self.data.view()
    }

    /// `(min, max)`.
    #[inline]
    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}
