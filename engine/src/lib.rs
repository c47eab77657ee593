//! Frame differencing for foveated redraws.
//!
//! [`compute_diff`] finds the smallest rectangle that changed between two
//! frames. [`FrameStateMachine`] keeps the comparison baseline and turns each
//! captured frame into a [`RenderPlan`]. [`stats`] estimates how much redraw
//! a plan saves.

pub mod bbox;
pub mod diff;
pub mod error;
pub mod metric;
pub mod plan;
pub mod settings;
pub mod state;
pub mod stats;

pub use bbox::{BoundingBox, Rect};
pub use diff::{compute_diff, compute_diff_with};
pub use error::EngineError;
pub use metric::DiffMetric;
pub use plan::RenderPlan;
pub use settings::{EngineSettings, Threshold};
pub use state::{FrameStateMachine, MachineState};

pub use fovea_common::frame::PixelBuffer;
