//! Pipeline entry points for detection operations.
//!
//! - `diff`: classify a catalog snapshot against stored records
//! - `dispatch`: hand one newly detected model to the notification agent
//! - `detect`: the per-tick orchestrator driving fetch → diff → dispatch → persist

pub mod detect;
pub mod diff;
pub mod dispatch;

pub use detect::Detector;
pub use diff::{ActionKind, Classifier, Delta, ModelAction, ReappearancePolicy};
pub use dispatch::Dispatcher;
