// Core traits for pluggable backends
//
// AssistantApi is the seam between the dispatch loop and the hosted assistant service:
// - docent-openai implements it over HTTP
// - InMemoryAssistantApi implements it for tests and examples

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::types::{AssistantSpec, CallbackResult, Message, MessageRole, Run};

// ============================================================================
// AssistantApi - The remote assistant-job service
// ============================================================================

/// Operations the dispatcher, gateway and knowledge base need from the remote service.
///
/// Errors from the remote (unknown thread/run id, auth failures) are returned
/// as-is; callers propagate them unchanged.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Upload a local file for use by assistants. Returns the remote file id.
    async fn upload_file(&self, path: &Path) -> Result<String>;

    /// Create a knowledge store over already uploaded files. Returns its id.
    async fn create_vector_store(&self, name: &str, file_ids: &[String]) -> Result<String>;

    /// Create an assistant. Returns its id.
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String>;

    /// Create a thread seeded with one user message and bound to a knowledge store.
    async fn create_thread(&self, prompt: &str, vector_store_id: &str) -> Result<String>;

    /// Append a message to an existing thread.
    async fn add_message(&self, thread_id: &str, role: MessageRole, content: &str) -> Result<()>;

    /// List thread messages, newest first (service storage order).
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>>;

    /// Start a run of `assistant_id` against `thread_id`.
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    /// Fetch the current state of a run.
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Answer every pending callback of a run in one request.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[CallbackResult],
    ) -> Result<Run>;

    /// Ask the service to cancel a run.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;
}
