//! Query-conditioned temporal grounding.
//!
//! [`GroundingEngine`] turns a video embedding and a query embedding into a
//! [`ModelOutput`] using a shared [`GroundingModel`].

mod engine;
mod error;
mod features;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod model;
mod types;


pub use engine::{GroundingEngine, Inference};
pub use error::GroundingError;
pub use features::{TemporalFeatures, l2_normalize_rows};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockGroundingModel;
pub use model::{GroundingModel, GroundingNet, GroundingNetConfig};
pub use types::{GroundingInput, GroundingTensors, ModelOutput};
