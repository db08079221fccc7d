//! The megachat gateway: job queue, turn engine, and the HTTP surface
//! that exposes them.

pub mod api;
pub mod cli;
pub mod jobs;
pub mod runtime;
pub mod state;
