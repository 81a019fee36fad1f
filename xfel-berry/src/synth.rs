//! 合成同心环图像.
//!
//! 用于测试同心环中心搜索, 以及在没有真实数据时评估搜索的耗时与精度.
//! 每个环在物理半径上呈高斯分布, 结果完全确定.

use crate::error::{AlgoError, AlgoResult};
use crate::Idx2d;
use ndarray::{Array2, Zip};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 同心环图案.
///
/// 位于像素 `(row, col)` 处的强度为
/// `background + amplitude * Σ exp(-(d - r_k)² / (2 σ²))`,
/// 其中 `d` 是该像素到中心 `(cx, cy)` 的物理距离, 以列方向的像素尺寸为单位.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RingPattern {
    cx: f64,
    cy: f64,
    radii: Vec<f64>,
    sigma: f64,
    amplitude: f64,
    background: f64,
    pixel_x: f64,
    pixel_y: f64,
}

impl RingPattern {
    /// 以中心 `(cx, cy)`, 环半径 `radii` 和环宽 `sigma` (均以像素为单位) 构建正方形像素的图案.
    /// 默认振幅为 100, 背景为 1.
    ///
    /// `sigma` 必须为正, 各半径必须为非负有限值.
    pub fn new(cx: f64, cy: f64, radii: &[f64], sigma: f64) -> AlgoResult<Self> {
        if !(cx.is_finite() && cy.is_finite()) {
            return Err(AlgoError::invalid(format!("环中心 ({cx}, {cy}) 不是有限值")));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(AlgoError::invalid(format!("环宽必须为正, 实际为 {sigma}")));
        }
        if radii.iter().any(|r| !(r.is_finite() && *r >= 0.0)) {
            return Err(AlgoError::invalid(format!("非法的环半径 {radii:?}")));
        }
        Ok(Self {
            cx,
            cy,
            radii: radii.to_vec(),
            sigma,
            amplitude: 100.0,
            background: 1.0,
            pixel_x: 1.0,
            pixel_y: 1.0,
        })
    }

    /// 设置振幅与背景.
    pub fn with_levels(mut self, amplitude: f64, background: f64) -> Self {
        self.amplitude = amplitude;
        self.background = background;
        self
    }

    /// 设置像素尺寸. 非正时返回 `Err(AlgoError::InvalidArgument)`.
    pub fn with_pixel_size(mut self, pixel_x: f64, pixel_y: f64) -> AlgoResult<Self> {
        if !(pixel_x.is_finite() && pixel_x > 0.0 && pixel_y.is_finite() && pixel_y > 0.0) {
            return Err(AlgoError::invalid(format!(
                "像素尺寸必须为正, 实际为 ({pixel_x}, {pixel_y})"
            )));
        }
        self.pixel_x = pixel_x;
        self.pixel_y = pixel_y;
        Ok(self)
    }

    /// 真实中心 `(cx, cy)`.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (self.cx, self.cy)
    }

    /// 单个像素的强度.
    pub fn value_at(&self, row: usize, col: usize) -> f64 {
        let dx = col as f64 - self.cx;
        let dy = (row as f64 - self.cy) * self.pixel_y / self.pixel_x;
        let d = dx.hypot(dy);
        let s2 = 2.0 * self.sigma * self.sigma;
        let rings: f64 = self
            .radii
            .iter()
            .map(|r| (-(d - r) * (d - r) / s2).exp())
            .sum();
        self.background + self.amplitude * rings
    }

    /// 生成形状为 `shape` 的图像.
    pub fn render(&self, shape: Idx2d) -> Array2<f64> {
        let mut img = Array2::<f64>::zeros(shape);
        let zip = Zip::indexed(&mut img);
        #[cfg(feature = "rayon")]
        zip.par_for_each(|(r, c), v| *v = self.value_at(r, c));
        #[cfg(not(feature = "rayon"))]
        zip.for_each(|(r, c), v| *v = self.value_at(r, c));
        img
    }
}
