// Conversation gateway
//
// Thin pass-through for thread lifecycle. Upstream errors (unknown thread id,
// auth) are returned unchanged.

use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::traits::AssistantApi;
use crate::types::{chronological, Message, MessageRole};

#[derive(Clone)]
pub struct ConversationGateway {
    api: Arc<dyn AssistantApi>,
}

impl ConversationGateway {
    pub fn new(api: Arc<dyn AssistantApi>) -> Self {
        Self { api }
    }

    /// Create a thread seeded with `prompt` and bound to a knowledge store.
    pub async fn start_thread(&self, prompt: &str, knowledge_store_id: &str) -> Result<String> {
        let thread_id = self.api.create_thread(prompt, knowledge_store_id).await?;
        info!(thread_id = %thread_id, knowledge_store_id = %knowledge_store_id, "Thread started");
        Ok(thread_id)
    }

    /// Append a user message to an existing thread.
    pub async fn add_message(&self, thread_id: &str, prompt: &str) -> Result<()> {
        self.api
            .add_message(thread_id, MessageRole::User, prompt)
            .await
    }

    /// Thread history, oldest first.
    pub async fn messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        Ok(chronological(self.api.list_messages(thread_id).await?))
    }
}
