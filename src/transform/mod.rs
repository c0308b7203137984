//! Series windowing and scaling.
//!
//! The forecasting models and the reconstruction detector both consume the
//! same sliding-window and min-max scaling primitives. Windows are created
//! per call and discarded; scaling states are small copyable structs.

pub mod scale;
pub mod window;

pub use scale::{apply, denormalize, normalize, ScalingState};
pub use window::{sequence_windows, training_windows};
