//! Provider abstraction: the contract the turn engine drives, a
//! registry that resolves named providers, a deterministic local stub,
//! an OpenAI-compatible streaming adapter, and the TTL-bounded model
//! cache.

pub mod cache;
pub mod openai;
pub mod registry;
pub mod sse;
pub mod stub;
pub mod traits;
mod util;

pub use cache::{CachedModels, ModelCache};
pub use openai::OpenAiProvider;
pub use registry::ProviderRegistry;
pub use stub::StubProvider;
pub use traits::{ChatMessage, ChatRequest, EventStream, ModelInfo, Provider, VerifyResult};
