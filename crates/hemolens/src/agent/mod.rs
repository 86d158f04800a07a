//! Role-agent personas, the model provider contract, and the sequential
//! pipeline that ties them together.

pub mod persona;
pub mod pipeline;
pub mod provider;

pub use persona::AgentPersona;
pub use pipeline::{AnalysisQuery, Pipeline, PipelineStep};
pub use provider::{ChatMessage, ChatProvider, GeminiProvider, Role};
