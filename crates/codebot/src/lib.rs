//! Chat-room code runner: watches messages for fenced code snippets,
//! executes them on a remote execution API, and replays the output on
//! demand via reactions.
//!
//! The crate is transport-agnostic. A deployment implements
//! [`gateway::ChatGateway`] and [`gateway::AuthPolicy`] against its chat
//! platform, wires up a [`backend::registry::BackendRegistry`] from the
//! config, and forwards inbound events to a [`pipeline::CompilePipeline`].

/// Remote execution providers and the backend registry.
pub mod backend;
/// Per-message cache of rendered compile output.
pub mod cache;
/// Operator slash commands (`/show-apis`, `/change-api`).
pub mod commands;
/// TOML configuration loading and wiring helpers.
pub mod config;
/// Chat transport and authorization seams.
pub mod gateway;
/// Fenced code-block parsing.
pub mod message;
/// The compile-on-message pipeline.
pub mod pipeline;
/// Language-specific source preprocessing.
pub mod processor;
/// Result rendering and channel-limit chunking.
pub mod render;

pub use backend::registry::BackendRegistry;
pub use backend::{ExecutionBackend, ExecutionRequest, ExecutionResult, TransportError};
pub use cache::CompilationCache;
pub use commands::{CommandHandler, SlashCommand};
pub use config::BotConfig;
pub use gateway::{AuthPolicy, ChatGateway, ChatMessage, ReactionEvent};
pub use pipeline::{CompilePipeline, PipelineConfig, BASKET, PLAY};
