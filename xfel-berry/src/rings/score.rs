use ndarray::ArrayView1;

/// 径向曲线的锐度: 有效值 (非 NaN) 的方差除以均值的平方.
///
/// 中心越准, 环越集中, 曲线的起伏越大, 得分越高. 除以均值平方使得分与强度的整体缩放无关.
///
/// - 没有有效值时返回 `-inf`, 任何有效曲线都优于它;
/// - 均值为 0 时返回 0.
pub fn sharpness(profile: ArrayView1<f64>) -> f64 {
    let (n, sum) = profile
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0usize, 0.0), |(n, s), &v| (n + 1, s + v));
    if n == 0 {
        return f64::NEG_INFINITY;
    }
    let mean = sum / n as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let var = profile
        .iter()
        .filter(|v| !v.is_nan())
        .map(|&v| (v - mean) * (v - mean))
        .sum::<f64>()
        / n as f64;
    var / (mean * mean)
}
