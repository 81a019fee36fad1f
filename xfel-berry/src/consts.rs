//! 通用常量.

/// 能量 (keV) 与波长 (埃) 的换算系数: `λ[Å] = HC_KEV_ANGSTROM / E[keV]`.
pub const HC_KEV_ANGSTROM: f64 = 12.3984;

/// 1 埃对应的米数.
pub const ANGSTROM: f64 = 1e-10;

/// 同心环搜索相关的默认值.
pub mod rings {
    /// 以像素为单位构建几何模型时使用的样品到探测器距离 (米).
    ///
    /// 该值只影响 `q` 的绝对尺度, 不影响环的锐度.
    pub const FINDER_DISTANCE: f64 = 1.0;

    /// 以像素为单位构建几何模型时使用的波长 (米).
    pub const FINDER_WAVELENGTH: f64 = 1e-10;

    /// 默认的初始搜索步长 (像素).
    pub const INITIAL_STEP: f64 = 2.0;

    /// 默认的终止步长 (像素). 步长小于该值时停止搜索.
    pub const MIN_STEP: f64 = 0.05;

    /// 默认的步长收缩系数.
    pub const SHRINK: f64 = 0.5;

    /// 默认的最大迭代次数.
    pub const MAX_ITERATIONS: u32 = 200;
}

/// 方位角积分相关的默认值.
pub mod integ {
    /// 默认的单个 bin 最少有效像素数.
    pub const MIN_COUNT: usize = 1;

    /// 每个任务至少处理的行数. 行数过少时并行反而更慢.
    pub const MIN_ROWS_PER_TASK: usize = 16;

    /// 单帧归约的最大任务数, 即部分直方图个数的上限.
    pub const MAX_TASKS: usize = 64;
}
