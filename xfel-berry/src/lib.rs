#![warn(missing_docs)]

//! 核心库. 为 X 射线探测器图像提供方位角积分 (azimuthal integration)
//! 与同心环中心搜索等数值算法.
//!
//! 该 crate 只提供 `safe` 接口, 所有图像都以 `ndarray` 视图的形式传入, 不做任何 I/O.
//!
//! # 注意
//!
//! 1. 所有参数都在计算开始前检查, 非法输入返回 [`AlgoError`], 不会 panic.
//! 2. 开启 `rayon` feature 时各算法并行执行, 结果与串行执行逐位一致.
//! 3. 像素类型限定为 [`Pixel`] 的实现者, 即各原生整数与浮点类型.
//!
//! # 开发计划
//!
//! ### 几何模型 ✅
//!
//! 由 PONI, 像素尺寸, 距离与波长计算每个像素的动量传递 `q`.
//!
//! 实现位于 `xfel-berry/src/geometry`.
//!
//! ### 径向直方图与方位角积分 ✅
//!
//! 单帧, 多帧 (批量) 以及任意维度输入的积分. q 映射按图像形状缓存.
//!
//! 实现位于 `xfel-berry/src/integrator`.
//!
//! ### 同心环中心搜索 ✅
//!
//! 以径向曲线锐度为目标的无导数模式搜索.
//!
//! 实现位于 `xfel-berry/src/rings`.
//!
//! ### 高斯平滑 ✅
//!
//! 实现位于 `xfel-berry/src/smooth.rs`.
//!
//! ### 忽略 NaN 的统计量 ✅
//!
//! 实现位于 `xfel-berry/src/statistics.rs`.
//!
//! ### 合成同心环图像 ✅
//!
//! 供测试与消融实验使用. 实现位于 `xfel-berry/src/synth.rs`.
//!
//! ### 其他积分方法 ⌛️
//!
//! 目前只有直方图法. 像素拆分 (pixel splitting) 尚未实现.

/// 二维索引 `(行, 列)`, 也用作图像形状.
pub type Idx2d = (usize, usize);

pub mod consts;

mod error;
pub use error::{AlgoError, AlgoResult};

mod pixel;
pub use pixel::Pixel;

pub mod geometry;
pub use geometry::{compute_q, energy_to_wavelength, GeometryParameters, RadiusMap};

pub mod integrator;
pub use integrator::{
    AzimuthalIntegrator, BatchIntegrationResult, Integrated, IntegrationMethod,
    IntegrationResult, ProfileStats,
};

pub mod rings;
pub use rings::{CenterEstimate, ConcentricRingsFinder, RingSearchConfig, SearchStatus};

pub mod smooth;
pub use smooth::{gaussian_blur, get_gaussian_kernel};

pub mod statistics;

pub mod synth;

pub mod prelude;
