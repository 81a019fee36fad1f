//! 高斯平滑.
//!
//! 核尺寸与 sigma 的约定和 OpenCV 的 `getGaussianKernel` / `GaussianBlur` 一致,
//! 边界使用 reflect-101 (`dcb|abcd|cba`).

use crate::error::{AlgoError, AlgoResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Zip};

/// `sigma <= 0` 时小尺寸核使用的固定系数.
const SMALL_KERNELS: [&[f64]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
];

/// 生成长度为 `size` 的归一化一维高斯核.
///
/// `size` 必须为正奇数, 否则返回 `Err(AlgoError::InvalidArgument)`.
/// `sigma <= 0` 时由核尺寸推导: `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
pub fn get_gaussian_kernel(size: usize, sigma: f64) -> AlgoResult<Array1<f64>> {
    if size == 0 || size % 2 == 0 {
        return Err(AlgoError::invalid(format!("高斯核尺寸必须为正奇数, 实际为 {size}")));
    }
    if sigma.is_nan() {
        return Err(AlgoError::invalid("sigma 不能为 NaN"));
    }
    if sigma <= 0.0 && size <= 7 {
        return Ok(Array1::from(SMALL_KERNELS[size / 2].to_vec()));
    }

    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((size - 1) as f64 * 0.5 - 1.0) + 0.8
    };
    let scale = -0.5 / (sigma * sigma);
    let half = (size / 2) as f64;
    let mut kernel = Array1::from_shape_fn(size, |i| {
        let x = i as f64 - half;
        (scale * x * x).exp()
    });
    let sum = kernel.sum();
    kernel /= sum;
    Ok(kernel)
}

/// reflect-101 边界下的下标.
#[inline]
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let i = i.rem_euclid(period);
    if i < n as isize {
        i as usize
    } else {
        (period - i) as usize
    }
}

/// 对一维数据做卷积, 结果写入 `out`.
fn convolve1d<T: num::Float>(src: ArrayView1<T>, mut out: ArrayViewMut1<T>, kernel: &[T]) {
    let n = src.len();
    let half = (kernel.len() / 2) as isize;
    for (i, o) in out.iter_mut().enumerate() {
        *o = kernel
            .iter()
            .enumerate()
            .fold(T::zero(), |acc, (k, &w)| {
                acc + w * src[reflect101(i as isize + k as isize - half, n)]
            });
    }
}

/// 以 `kernel_size` 的高斯核平滑 `src`, 结果写入 `dst`.
///
/// 先逐行后逐列做可分离卷积. `dst` 与 `src` 形状不同时返回
/// `Err(AlgoError::ShapeMismatch)`; 核参数非法时返回 `Err(AlgoError::InvalidArgument)`.
///
/// NaN 会扩散到核覆盖范围内的像素.
pub fn gaussian_blur<T>(
    src: ArrayView2<T>,
    mut dst: ArrayViewMut2<T>,
    kernel_size: usize,
    sigma: f64,
) -> AlgoResult<()>
where
    T: num::Float + Send + Sync,
{
    if src.shape() != dst.shape() {
        return Err(AlgoError::shape(src.shape(), dst.shape()));
    }
    let kernel = get_gaussian_kernel(kernel_size, sigma)?
        .iter()
        .map(|&w| T::from(w).ok_or_else(|| AlgoError::invalid(format!("无法表示核系数 {w}"))))
        .collect::<AlgoResult<Vec<T>>>()?;
    if src.is_empty() {
        return Ok(());
    }

    let mut tmp = Array2::<T>::zeros(src.dim());
    let row_pass = Zip::from(tmp.rows_mut()).and(src.rows());
    #[cfg(feature = "rayon")]
    row_pass.par_for_each(|out, inp| convolve1d(inp, out, &kernel));
    #[cfg(not(feature = "rayon"))]
    row_pass.for_each(|out, inp| convolve1d(inp, out, &kernel));

    let col_pass = Zip::from(dst.columns_mut()).and(tmp.columns());
    #[cfg(feature = "rayon")]
    col_pass.par_for_each(|out, inp| convolve1d(inp, out, &kernel));
    #[cfg(not(feature = "rayon"))]
    col_pass.for_each(|out, inp| convolve1d(inp, out, &kernel));

    Ok(())
}

/// 与 [`gaussian_blur`] 相同, 但返回新的数组.
pub fn gaussian_blurred<T>(src: ArrayView2<T>, kernel_size: usize, sigma: f64) -> AlgoResult<Array2<T>>
where
    T: num::Float + Send + Sync,
{
    let mut dst = Array2::<T>::zeros(src.dim());
    gaussian_blur(src, dst.view_mut(), kernel_size, sigma)?;
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::{gaussian_blur, gaussian_blurred, get_gaussian_kernel, reflect101};
    use crate::error::AlgoError;
    use ndarray::{arr2, Array2};

    #[test]
    fn test_kernel() {
        let k = get_gaussian_kernel(3, 0.85).unwrap();
        for (a, b) in k.iter().zip([0.25, 0.5, 0.25]) {
            assert!((a - b).abs() < 1e-3);
        }
        assert_eq!(get_gaussian_kernel(1, 0.0).unwrap().to_vec(), vec![1.0]);
        assert_eq!(get_gaussian_kernel(3, 0.0).unwrap().to_vec(), vec![0.25, 0.5, 0.25]);

        let k = get_gaussian_kernel(9, 0.0).unwrap();
        assert!((k.sum() - 1.0).abs() < 1e-12);
        assert!(k.iter().zip(k.iter().rev()).all(|(a, b)| (a - b).abs() < 1e-15));
        assert!(k[4] > k[3]);
    }

    #[test]
    fn test_kernel_err() {
        for size in [0, 2, 4, 8] {
            assert!(matches!(
                get_gaussian_kernel(size, 1.0),
                Err(AlgoError::InvalidArgument(_))
            ));
        }
        assert!(get_gaussian_kernel(3, f64::NAN).is_err());
    }

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(6, 5), 2);
        assert_eq!(reflect101(3, 1), 0);
    }

    #[test]
    fn test_flat_stays_flat() {
        let src = Array2::<f32>::from_elem((7, 11), 3.0);
        let dst = gaussian_blurred(src.view(), 5, 1.2).unwrap();
        assert!(dst.iter().all(|v| (v - 3.0).abs() < 1e-5));
    }

    #[test]
    fn test_blur_values() {
        let src = arr2(&[[0.0, 4.0, 0.0], [0.0, 4.0, 0.0]]);
        let dst = gaussian_blurred(src.view(), 3, 0.0).unwrap();
        // 行方向: reflect-101 下左右两列都取到中间的 4.
        assert_eq!(dst, arr2(&[[2.0, 2.0, 2.0], [2.0, 2.0, 2.0]]));
    }

    #[test]
    fn test_shape_mismatch() {
        let src = Array2::<f64>::zeros((4, 4));
        let mut dst = Array2::<f64>::zeros((4, 5));
        assert!(matches!(
            gaussian_blur(src.view(), dst.view_mut(), 3, 0.0),
            Err(AlgoError::ShapeMismatch { .. })
        ));
    }
}
