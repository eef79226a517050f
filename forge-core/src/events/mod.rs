//! Progress events and the broadcast bus.

pub mod bus;
pub mod types;

pub use bus::{ProgressBus, RunReceiver, SharedProgressBus};
pub use types::{CompletePayload, ErrorPayload, PipelineEvent, ProgressPayload};
