//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::error::{AlgoError, AlgoResult};
pub use crate::pixel::Pixel;

pub use crate::geometry::{compute_q, energy_to_wavelength, GeometryParameters};
pub use crate::integrator::{
    AzimuthalIntegrator, BatchIntegrationResult, IntegrationMethod, IntegrationResult,
};
pub use crate::rings::{CenterEstimate, ConcentricRingsFinder, RingSearchConfig, SearchStatus};

pub use crate::smooth::{gaussian_blur, get_gaussian_kernel};
pub use crate::statistics::{nanmean, nanmean_images, nanstd, nansum, nanvar, quick_min_max};
pub use crate::synth::RingPattern;
