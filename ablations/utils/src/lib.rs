//! 消融实验依赖的通用组件.

use xfel_berry::ConcentricRingsFinder;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 合成图像的像素尺寸 (米). 行列方向相同.
pub const PIXEL: f64 = 1e-4;

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 创建与合成图像像素尺寸一致的同心环搜索器, 使用默认搜索参数.
#[inline]
pub fn square_pixel_finder() -> ConcentricRingsFinder {
    // PIXEL 为正的常量, 构建不会失败.
    match ConcentricRingsFinder::new(PIXEL, PIXEL) {
        Ok(f) => f,
        Err(e) => unreachable!("{e}"),
    }
}
