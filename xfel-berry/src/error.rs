//! 运行时错误.

use thiserror::Error;

/// 积分、平滑与中心搜索的运行时错误.
///
/// 所有参数检查都在计算开始之前完成, 因此返回 `Err` 时不存在任何部分结果.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlgoError {
    /// 非法参数, 例如 `npt == 0`, 未知的积分方法, 非正的几何参数, 偶数高斯核尺寸.
    #[error("非法参数: {0}")]
    InvalidArgument(String),

    /// 形状不一致. 例如图像栈中帧的形状不同, 或输出缓冲区与输入形状不符.
    #[error("形状不一致: 期望 {expected:?}, 实际 {found:?}")]
    ShapeMismatch {
        /// 期望的形状.
        expected: Vec<usize>,
        /// 实际的形状.
        found: Vec<usize>,
    },

    /// 整帧不存在任何有效像素.
    #[error("数据不足: {0}")]
    InsufficientData(String),

    /// 同心环中心搜索未能改进初始猜测. 携带搜索过程中最好的估计.
    ///
    /// 这是一个 "软" 错误, 由调用者决定是否更换初值重试.
    #[error("搜索未收敛: 最佳估计 ({cx:.3}, {cy:.3}), 得分 {score:.6}")]
    ConvergenceFailure {
        /// 最佳估计的 x (列方向) 坐标.
        cx: f64,
        /// 最佳估计的 y (行方向) 坐标.
        cy: f64,
        /// 最佳估计的锐度得分.
        score: f64,
    },
}

impl AlgoError {
    /// 以 `&str` 快速构建 [`AlgoError::InvalidArgument`].
    #[inline]
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// 由两个形状快速构建 [`AlgoError::ShapeMismatch`].
    #[inline]
    pub(crate) fn shape(expected: &[usize], found: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// 是否是可以由调用者自行处理的软错误.
    #[inline]
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::ConvergenceFailure { .. })
    }
}

/// 本 crate 的通用返回类型.
pub type AlgoResult<T> = Result<T, AlgoError>;

#[cfg(test)]
mod tests {
    use super::AlgoError;

    #[test]
    fn test_soft_error() {
        let e = AlgoError::ConvergenceFailure {
            cx: 1.0,
            cy: 2.0,
            score: 0.5,
        };
        assert!(e.is_soft());
        assert!(!AlgoError::invalid("npt").is_soft());
        assert!(!AlgoError::shape(&[2, 3], &[3, 2]).is_soft());
    }

    #[test]
    fn test_error_display() {
        let e = AlgoError::shape(&[16, 128], &[32, 16]);
        assert_eq!(e.to_string(), "形状不一致: 期望 [16, 128], 实际 [32, 16]");
        assert_eq!(
            AlgoError::invalid("npt 必须为正").to_string(),
            "非法参数: npt 必须为正"
        );
    }
}
