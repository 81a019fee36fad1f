//! 探测器像素值类型.
//!
//! 探测器读出可能是整数 (如 `u16`, `i16`) 也可能是浮点数 (如 `f32`).
//! 所有归约都在 `f64` 中累加, 因此整数输入不会溢出, 输出总是浮点数.

mod sealed {
    pub trait Sealed {}
}

/// 可被积分的像素类型. 该集合是封闭的, 仅包括原生整数与浮点类型.
pub trait Pixel: Copy + Send + Sync + sealed::Sealed + 'static {
    /// 拓宽为 `f64`.
    fn widen(self) -> f64;

    /// 像素是否有效. 浮点 NaN 表示被掩膜的像素, 整数像素总是有效.
    fn is_valid(self) -> bool;
}

macro_rules! impl_pixel_int {
    ($($t: ty),*) => {
        $(
            impl sealed::Sealed for $t {}

            impl Pixel for $t {
                #[inline]
                fn widen(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn is_valid(self) -> bool {
                    true
                }
            }
        )*
    };
}

macro_rules! impl_pixel_float {
    ($($t: ty),*) => {
        $(
            impl sealed::Sealed for $t {}

            impl Pixel for $t {
                #[inline]
                fn widen(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn is_valid(self) -> bool {
                    !self.is_nan()
                }
            }
        )*
    };
}

impl_pixel_int!(u8, u16, u32, u64, i8, i16, i32, i64);
impl_pixel_float!(f32, f64);
