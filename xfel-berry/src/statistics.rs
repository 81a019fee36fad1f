//! 忽略无效值 (NaN) 的统计量.
//!
//! 整数类型的像素总是有效的, 浮点像素中的 NaN 被跳过. 所有结果以 `f64` 表示.

use crate::error::{AlgoError, AlgoResult};
use crate::integrator::histogram::{BinEdges, RadialBin};
use crate::pixel::Pixel;
use itertools::{Itertools, MinMaxResult};
use ndarray::{Array1, Array2, ArrayView, ArrayView1, ArrayView3, Axis, Dimension, Zip};
use ordered_float::OrderedFloat;

/// 有效值的迭代器.
#[inline]
fn valid_values<'a, 'b: 'a, T: Pixel, D: Dimension + 'a>(
    data: &'a ArrayView<'b, T, D>,
) -> impl Iterator<Item = f64> + 'a {
    data.iter().filter(|v| v.is_valid()).map(|v| v.widen())
}

/// 有效值的个数与累加量.
fn accumulate<T: Pixel, D: Dimension>(data: &ArrayView<T, D>) -> RadialBin {
    valid_values(data).fold(RadialBin::default(), |mut bin, v| {
        bin.push(v);
        bin
    })
}

/// 有效值之和. 没有有效值时为 0.
pub fn nansum<T: Pixel, D: Dimension>(data: ArrayView<T, D>) -> f64 {
    valid_values(&data).sum()
}

/// 有效值的均值. 没有有效值时为 NaN.
pub fn nanmean<T: Pixel, D: Dimension>(data: ArrayView<T, D>) -> f64 {
    accumulate(&data).mean(1)
}

/// 有效值的方差, 分母为 `n - ddof`. 有效值不多于 `ddof` 个时为 NaN.
///
/// 先求均值再求偏差平方和, 避免大数相减带来的精度损失.
pub fn nanvar<T: Pixel, D: Dimension>(data: ArrayView<T, D>, ddof: usize) -> f64 {
    let bin = accumulate(&data);
    if bin.count as usize <= ddof {
        return f64::NAN;
    }
    let mean = bin.sum / bin.count as f64;
    let ss: f64 = valid_values(&data).map(|v| (v - mean) * (v - mean)).sum();
    ss / (bin.count as usize - ddof) as f64
}

/// 有效值的标准差, 分母为 `n - ddof`.
#[inline]
pub fn nanstd<T: Pixel, D: Dimension>(data: ArrayView<T, D>, ddof: usize) -> f64 {
    nanvar(data, ddof).sqrt()
}

/// 有效值的最小值与最大值. 没有有效值时返回 `None`.
pub fn quick_min_max<T: Pixel, D: Dimension>(data: ArrayView<T, D>) -> Option<(f64, f64)> {
    match valid_values(&data).minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
    }
}

/// 逐像素求一组图像的均值, 忽略 NaN. `stack` 的形状为 `(帧, 行, 列)`.
///
/// 某像素在所有帧中都无效时结果为 NaN. 帧数为 0 时返回 `Err(AlgoError::InvalidArgument)`.
pub fn nanmean_images<T: Pixel>(stack: ArrayView3<T>) -> AlgoResult<Array2<f64>> {
    let (n, rows, cols) = stack.dim();
    if n == 0 {
        return Err(AlgoError::invalid("图像组为空"));
    }
    let mut out = Array2::<f64>::zeros((rows, cols));
    let zip = Zip::from(&mut out).and(stack.lanes(Axis(0)));
    let mean_of = |o: &mut f64, lane: ArrayView1<T>| *o = nanmean(lane);
    #[cfg(feature = "rayon")]
    zip.par_for_each(mean_of);
    #[cfg(not(feature = "rayon"))]
    zip.for_each(mean_of);
    Ok(out)
}

/// [`hist_with_stats`] 的结果.
#[derive(Clone, Debug, PartialEq)]
pub struct HistStats {
    /// 每个 bin 的计数.
    pub counts: Array1<u64>,
    /// bin 中心.
    pub centers: Array1<f64>,
    /// 全体有效值的均值.
    pub mean: f64,
    /// 全体有效值的中位数.
    pub median: f64,
    /// 全体有效值的标准差 (总体).
    pub std: f64,
}

/// 将有效值等宽划分为 `bins` 个 bin 并计数, 同时给出均值, 中位数和标准差.
///
/// `range` 为 `None` 时取有效值的最小值与最大值. 区间外的值不计入直方图, 但计入统计量.
///
/// # 返回值
///
/// - `bins == 0` 或区间非法时, 返回 `Err(AlgoError::InvalidArgument)`;
/// - 没有有效值时, 返回 `Err(AlgoError::InsufficientData)`.
pub fn hist_with_stats<T: Pixel, D: Dimension>(
    data: ArrayView<T, D>,
    bins: usize,
    range: Option<(f64, f64)>,
) -> AlgoResult<HistStats> {
    let mut values = valid_values(&data).collect::<Vec<_>>();
    if values.is_empty() {
        return Err(AlgoError::InsufficientData("没有有效值".to_string()));
    }
    let (lo, hi) = match range {
        Some(r) => r,
        None => quick_min_max(data.view()).unwrap_or_default(),
    };
    let edges = BinEdges::new(lo, hi, bins)?;

    let mut counts = Array1::<u64>::zeros(bins);
    let mut total = RadialBin::default();
    for &v in &values {
        total.push(v);
        if let Some(i) = edges.index_of(v) {
            counts[i] += 1;
        }
    }

    values.sort_unstable_by_key(|&v| OrderedFloat(v));
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };

    Ok(HistStats {
        counts,
        centers: edges.centers(),
        mean: total.mean(1),
        median,
        std: total.std(1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, s, Array3};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_nan_reductions() {
        let a = arr1(&[1.0, f64::NAN, 3.0, 4.0]);
        assert_eq!(nansum(a.view()), 8.0);
        assert!(f64_eq(nanmean(a.view()), 8.0 / 3.0));
        // 偏差平方和 = 25/9 + 1/9 + 16/9 = 42/9
        assert!(f64_eq(nanvar(a.view(), 0), 14.0 / 9.0));
        assert!(f64_eq(nanvar(a.view(), 1), 7.0 / 3.0));
        assert!(f64_eq(nanstd(a.view(), 0), (14.0f64 / 9.0).sqrt()));

        let empty = arr1(&[f64::NAN]);
        assert_eq!(nansum(empty.view()), 0.0);
        assert!(nanmean(empty.view()).is_nan());
        assert!(nanvar(arr1(&[2.0]).view(), 1).is_nan());
    }

    /// 行, 列与切片视图都可以直接参与统计.
    #[test]
    fn test_borrowed_views() {
        let a = arr2(&[[1.0, f64::NAN, 5.0], [2.0, 3.0, 4.0]]);
        assert_eq!(nansum(a.row(1)), 9.0);
        assert_eq!(quick_min_max(a.slice(s![.., 1..])), Some((3.0, 5.0)));
        assert!(f64_eq(nanvar(a.column(0), 0), 0.25));
        let h = hist_with_stats(a.row(0), 2, None).unwrap();
        assert_eq!(h.counts.to_vec(), vec![1, 1]);
    }

    #[test]
    fn test_integer_input() {
        let a = arr2(&[[1u16, 2], [3, 4]]);
        assert_eq!(nansum(a.view()), 10.0);
        assert_eq!(nanmean(a.view()), 2.5);
        assert_eq!(quick_min_max(a.view()), Some((1.0, 4.0)));
    }

    #[test]
    fn test_quick_min_max() {
        assert_eq!(quick_min_max(arr1(&[f64::NAN, 2.0]).view()), Some((2.0, 2.0)));
        assert_eq!(quick_min_max(arr1(&[f32::NAN]).view()), None);
        assert_eq!(
            quick_min_max(arr1(&[5.0f32, -1.0, f32::NAN, 3.0]).view()),
            Some((-1.0, 5.0))
        );
    }

    #[test]
    fn test_nanmean_images() {
        let mut stack = Array3::<f32>::zeros((3, 2, 2));
        stack.index_axis_mut(Axis(0), 0).fill(1.0);
        stack.index_axis_mut(Axis(0), 1).fill(2.0);
        stack.index_axis_mut(Axis(0), 2).fill(6.0);
        stack[[2, 0, 0]] = f32::NAN;
        for i in 0..3 {
            stack[[i, 1, 1]] = f32::NAN;
        }
        let ret = nanmean_images(stack.view()).unwrap();
        assert_eq!(ret[[0, 0]], 1.5);
        assert_eq!(ret[[0, 1]], 3.0);
        assert!(ret[[1, 1]].is_nan());

        assert!(nanmean_images(Array3::<f32>::zeros((0, 2, 2)).view()).is_err());
    }

    #[test]
    fn test_hist_with_stats() {
        let a = arr1(&[0.0, 1.0, 1.0, 2.0, 3.0, 4.0, f64::NAN]);
        let h = hist_with_stats(a.view(), 4, None).unwrap();
        assert_eq!(h.counts.to_vec(), vec![1, 2, 1, 2]);
        assert_eq!(h.centers.to_vec(), vec![0.5, 1.5, 2.5, 3.5]);
        assert!(f64_eq(h.mean, 11.0 / 6.0));
        assert_eq!(h.median, 1.5);

        let h = hist_with_stats(a.view(), 2, Some((0.5, 2.5))).unwrap();
        assert_eq!(h.counts.to_vec(), vec![2, 1]);
        assert_eq!(h.median, 1.5);

        assert!(matches!(
            hist_with_stats(a.view(), 0, None),
            Err(AlgoError::InvalidArgument(_))
        ));
        assert!(matches!(
            hist_with_stats(arr1(&[f64::NAN]).view(), 4, None),
            Err(AlgoError::InsufficientData(_))
        ));
    }
}
