//! Turn-engine runtime: cancellation, settings resolution, token
//! estimation, the engine's public surface, and the detached worker.

pub mod cancel;
pub mod engine;
pub mod resolve;
pub mod tokens;
mod worker;

pub use cancel::CancelToken;
pub use engine::{ChatEngine, ModelsResult, NewRunRequest, RunSettingsResult};
