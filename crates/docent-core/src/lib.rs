// Docent core
//
// Orchestration over a hosted assistant service: create assistants bound to a
// knowledge store, start threads, relay prompts, and answer the callbacks a run
// requests (news lookup, web scraping) until it reaches a terminal status.
//
// Key design decisions:
// - The remote service is reached only through the AssistantApi trait
// - Capabilities are registered once in a CapabilityRegistry and validated at startup
// - Callback failures become output strings so every batch can be answered
// - The poll loop is bounded by a deadline and observes a CancellationToken
// - A single Docent context owns long-lived clients; components get Arc clones

pub mod capabilities;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod knowledge;
pub mod runtime;
pub mod telemetry;
pub mod traits;
pub mod types;

// In-memory assistant service for examples and testing
pub mod memory;

// Re-exports for convenience
pub use capabilities::{
    Capability, CapabilityRegistry, CapabilityRegistryBuilder, CapabilityResult, NewsCapability,
    ScrapeCapability,
};
pub use config::DocentConfig;
pub use dispatcher::{resolve_callback, DispatchOptions, RunDispatcher};
pub use error::{DocentError, Result};
pub use gateway::ConversationGateway;
pub use knowledge::{AssistantHandle, KnowledgeBase};
pub use runtime::{build_http_client, Docent};
pub use traits::AssistantApi;
pub use types::{
    chronological, AssistantSpec, CallbackRequest, CallbackResult, Message, MessageRole,
    RequiredAction, Run, RunError, RunOutcome, RunStatus, ToolSpec,
};
