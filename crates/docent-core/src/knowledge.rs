// Knowledge base management
//
// Uploads local documents and creates the vector store + assistant pair that
// threads are later bound to.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::capabilities::CapabilityRegistry;
use crate::config::DocentConfig;
use crate::error::Result;
use crate::traits::AssistantApi;
use crate::types::{AssistantSpec, ToolSpec};

/// Ids returned when an assistant is created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistantHandle {
    pub assistant_id: String,
    pub vector_store_id: String,
}

#[derive(Clone)]
pub struct KnowledgeBase {
    api: Arc<dyn AssistantApi>,
    registry: Arc<CapabilityRegistry>,
    config: Arc<DocentConfig>,
}

impl KnowledgeBase {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        registry: Arc<CapabilityRegistry>,
        config: Arc<DocentConfig>,
    ) -> Self {
        Self {
            api,
            registry,
            config,
        }
    }

    /// Upload a document, then remove the local copy.
    ///
    /// The local file is only removed after the upload succeeded. A failed
    /// removal is logged; the remote file id is still returned.
    pub async fn upload_document(&self, path: &Path) -> Result<String> {
        let file_id = self.api.upload_file(path).await?;
        info!(file_id = %file_id, path = %path.display(), "Document uploaded");

        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove uploaded document");
        }
        Ok(file_id)
    }

    /// Assistant definition bound to `vector_store_id`
    pub fn assistant_spec(&self, title: &str, vector_store_id: &str) -> AssistantSpec {
        let mut tools = vec![ToolSpec::FileSearch, ToolSpec::CodeInterpreter];
        tools.extend(self.registry.function_tools());

        AssistantSpec {
            name: title.to_string(),
            instructions: self.config.instructions.clone(),
            model: self.config.model.clone(),
            tools,
            vector_store_ids: vec![vector_store_id.to_string()],
        }
    }

    /// Create a vector store over `file_ids` and an assistant that searches it.
    pub async fn create_assistant(&self, title: &str, file_ids: &[String]) -> Result<AssistantHandle> {
        let vector_store_id = self.api.create_vector_store(title, file_ids).await?;
        info!(vector_store_id = %vector_store_id, files = file_ids.len(), "Vector store created");

        let spec = self.assistant_spec(title, &vector_store_id);
        let assistant_id = self.api.create_assistant(&spec).await?;
        info!(assistant_id = %assistant_id, model = %spec.model, "Assistant created");

        Ok(AssistantHandle {
            assistant_id,
            vector_store_id,
        })
    }
}
