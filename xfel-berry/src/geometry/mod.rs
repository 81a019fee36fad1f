//! 探测器几何模型.
//!
//! 我们一般使用行优先编码存储二维图像. 行方向 (第一个索引) 对应 PONI 的第一个分量 `poni1`
//! 和像素尺寸 `pixel1`, 列方向 (第二个索引) 对应 `poni2` 和 `pixel2`.
//!
//! 像素索引 `i` 位于探测器平面上 `i * pixel` 处, 因此 `poni = c * pixel` 意味着入射光束
//! 正好落在索引为 `c` 的像素上. 该约定与 [`crate::ConcentricRingsFinder`] 共享.
//!
//! 对于像素 `(row, col)`:
//!
//! - `d1 = row * pixel1 - poni1`, `d2 = col * pixel2 - poni2`;
//! - 散射角 `2θ = atan2(sqrt(d1² + d2²), distance)`;
//! - 动量转移 `q = 4π · sin(θ) / wavelength`, 单位为 1/m.
//!
//! `q` 关于像素到 PONI 的距离严格单调递增, 分箱步骤依赖这一性质.

mod radius_map;

use crate::consts::{rings, ANGSTROM, HC_KEV_ANGSTROM};
use crate::error::{AlgoError, AlgoResult};
use crate::Idx2d;
use ndarray::{Array2, Zip};
use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use radius_map::RadiusMap;

/// 仪器几何参数. 所有长度单位均为米.
///
/// 该结构是只读的. 若要修改参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeometryParameters {
    /// 样品到探测器的距离.
    distance: f64,
    /// PONI 在行方向上的偏移.
    poni1: f64,
    /// PONI 在列方向上的偏移.
    poni2: f64,
    /// 行方向像素尺寸.
    pixel1: f64,
    /// 列方向像素尺寸.
    pixel2: f64,
    /// 入射光波长.
    wavelength: f64,
}

impl GeometryParameters {
    /// 构建几何参数.
    ///
    /// # 返回值
    ///
    /// - 当 `distance`, `pixel1`, `pixel2`, `wavelength` 中存在非有限值或非正值时,
    ///   返回 `Err(AlgoError::InvalidArgument)`;
    /// - 当 `poni1` 或 `poni2` 不是有限值时, 返回 `Err(AlgoError::InvalidArgument)`.
    ///   PONI 可以落在探测器之外, 因此允许为负;
    /// - 其他情况下成功.
    pub fn new(
        distance: f64,
        poni1: f64,
        poni2: f64,
        pixel1: f64,
        pixel2: f64,
        wavelength: f64,
    ) -> AlgoResult<Self> {
        for (name, v) in [
            ("distance", distance),
            ("pixel1", pixel1),
            ("pixel2", pixel2),
            ("wavelength", wavelength),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(AlgoError::invalid(format!("{name} 必须为正的有限值, 实际为 {v}")));
            }
        }
        for (name, v) in [("poni1", poni1), ("poni2", poni2)] {
            if !v.is_finite() {
                return Err(AlgoError::invalid(format!("{name} 必须为有限值, 实际为 {v}")));
            }
        }
        Ok(Self {
            distance,
            poni1,
            poni2,
            pixel1,
            pixel2,
            wavelength,
        })
    }

    /// 以像素坐标 `(cx, cy)` 为中心构建几何参数. `cx` 为列方向坐标, `cy` 为行方向坐标.
    ///
    /// 距离和波长取固定值, 只用于比较不同中心下的径向分布.
    pub fn from_pixel_center(cx: f64, cy: f64, pixel_x: f64, pixel_y: f64) -> AlgoResult<Self> {
        Self::new(
            rings::FINDER_DISTANCE,
            cy * pixel_y,
            cx * pixel_x,
            pixel_y,
            pixel_x,
            rings::FINDER_WAVELENGTH,
        )
    }

    /// 样品到探测器的距离.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// PONI 行方向偏移.
    #[inline]
    pub fn poni1(&self) -> f64 {
        self.poni1
    }

    /// PONI 列方向偏移.
    #[inline]
    pub fn poni2(&self) -> f64 {
        self.poni2
    }

    /// 行方向像素尺寸.
    #[inline]
    pub fn pixel1(&self) -> f64 {
        self.pixel1
    }

    /// 列方向像素尺寸.
    #[inline]
    pub fn pixel2(&self) -> f64 {
        self.pixel2
    }

    /// 波长.
    #[inline]
    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    /// PONI 所在的 (可能是小数的) 像素坐标 `(row, col)`.
    #[inline]
    pub fn center_pixel(&self) -> (f64, f64) {
        (self.poni1 / self.pixel1, self.poni2 / self.pixel2)
    }

    /// 像素 `(row, col)` 处的动量转移 `q`.
    #[inline]
    pub fn radius_at(&self, row: usize, col: usize) -> f64 {
        let d1 = row as f64 * self.pixel1 - self.poni1;
        let d2 = col as f64 * self.pixel2 - self.poni2;
        compute_q(self.distance, d1.hypot(d2), self.wavelength)
    }

    /// 计算形状为 `shape` 的图像中每个像素的 `q`.
    ///
    /// 每个像素的计算相互独立, 开启 `rayon` feature 时并行执行.
    pub fn radius_map(&self, shape: Idx2d) -> RadiusMap {
        let mut data = Array2::<f64>::zeros(shape);
        #[cfg(feature = "rayon")]
        Zip::indexed(&mut data).par_for_each(|(i, j), q| *q = self.radius_at(i, j));
        #[cfg(not(feature = "rayon"))]
        Zip::indexed(&mut data).for_each(|(i, j), q| *q = self.radius_at(i, j));
        RadiusMap::new(data)
    }
}

/// 由探测器平面上到 PONI 的距离 `x` 计算动量转移 `q` (1/m).
///
/// `distance` 为样品到探测器的距离, `wavelength` 为波长, 单位均为米.
#[inline]
pub fn compute_q(distance: f64, x: f64, wavelength: f64) -> f64 {
    let tth = x.atan2(distance);
    4.0 * PI * (tth / 2.0).sin() / wavelength
}

/// 光子能量 (keV) 转换为波长 (米).
///
/// 当 `energy` 不是正的有限值时, 返回 `Err(AlgoError::InvalidArgument)`.
pub fn energy_to_wavelength(energy: f64) -> AlgoResult<f64> {
    if !(energy.is_finite() && energy > 0.0) {
        return Err(AlgoError::invalid(format!("光子能量必须为正, 实际为 {energy}")));
    }
    Ok(ANGSTROM * HC_KEV_ANGSTROM / energy)
}

#[cfg(test)]
mod tests {
    use super::{compute_q, energy_to_wavelength, GeometryParameters};
    use crate::error::AlgoError;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    fn geometry() -> GeometryParameters {
        // 光束落在探测器外侧.
        let (pixel1, pixel2) = (1e-4, 2e-4);
        GeometryParameters::new(0.2, -6.0 * pixel1, 130.0 * pixel2, pixel1, pixel2, 1e-10)
            .unwrap()
    }

    #[test]
    fn test_geometry_init_err() {
        let bad = [
            GeometryParameters::new(0.0, 0.0, 0.0, 1e-4, 1e-4, 1e-10),
            GeometryParameters::new(1.0, 0.0, 0.0, -1e-4, 1e-4, 1e-10),
            GeometryParameters::new(1.0, 0.0, 0.0, 1e-4, 0.0, 1e-10),
            GeometryParameters::new(1.0, 0.0, 0.0, 1e-4, 1e-4, 0.0),
            GeometryParameters::new(f64::NAN, 0.0, 0.0, 1e-4, 1e-4, 1e-10),
            GeometryParameters::new(1.0, f64::INFINITY, 0.0, 1e-4, 1e-4, 1e-10),
        ];
        for r in bad {
            assert!(matches!(r, Err(AlgoError::InvalidArgument(_))));
        }
        // 负的 PONI 是合法的.
        assert!(GeometryParameters::new(1.0, -1e-3, -1e-3, 1e-4, 1e-4, 1e-10).is_ok());
    }

    #[test]
    fn test_radius_at_poni_is_zero() {
        let g = GeometryParameters::from_pixel_center(7.0, 5.0, 1e-4, 2e-4).unwrap();
        let (row, col) = g.center_pixel();
        assert!(f64_eq(row, 5.0) && f64_eq(col, 7.0));
        assert_eq!(g.radius_at(5, 7), 0.0);
        assert!(g.radius_at(5, 8) > 0.0);
        // 行方向像素更大, 同样偏移一个像素时 q 更大.
        assert!(g.radius_at(6, 7) > g.radius_at(5, 8));
    }

    /// `q` 关于像素距离单调递增.
    #[test]
    fn test_radius_monotonic() {
        let g = GeometryParameters::from_pixel_center(0.0, 0.0, 1e-4, 1e-4).unwrap();
        let mut prev = -1.0;
        for k in 0..200 {
            let q = g.radius_at(k, k);
            assert!(q > prev);
            prev = q;
        }
    }

    #[test]
    fn test_radius_map_matches_pointwise() {
        let g = geometry();
        let m = g.radius_map((16, 128));
        assert_eq!(m.shape(), (16, 128));
        for (i, j) in [(0, 0), (3, 100), (15, 127), (8, 64)] {
            assert!(f64_eq(m.view()[(i, j)], g.radius_at(i, j)));
        }
        let (lo, hi) = m.range();
        assert!(lo < hi);
        assert!(m.view().iter().all(|&q| lo <= q && q <= hi));
    }

    #[test]
    fn test_compute_q_small_angle() {
        // 小角近似下 q ≈ 2π x / (λ L).
        let (dist, x, wl) = (1.0, 1e-4, 1e-10);
        let approx = 2.0 * std::f64::consts::PI * x / (wl * dist);
        assert!((compute_q(dist, x, wl) - approx).abs() / approx < 1e-6);
        assert_eq!(compute_q(dist, 0.0, wl), 0.0);
    }

    #[test]
    fn test_energy_to_wavelength() {
        assert!(f64_eq(energy_to_wavelength(12.3984).unwrap(), 1e-10));
        assert!(energy_to_wavelength(0.0).is_err());
        assert!(energy_to_wavelength(-1.0).is_err());
    }
}
