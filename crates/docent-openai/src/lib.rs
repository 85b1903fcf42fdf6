// OpenAI Assistants Implementation
//
// This crate connects docent-core to OpenAI's hosted Assistants API (v2).
// It implements the AssistantApi trait, translating between the REST wire
// format and the reduced run, callback and message types the dispatcher uses.

mod client;
mod types;

#[cfg(test)]
mod tests;

pub use client::OpenAiAssistantsClient;

// Re-export core trait for convenience
pub use docent_core::AssistantApi;
