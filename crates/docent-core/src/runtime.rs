// Docent runtime context
//
// One process-wide context owns the long-lived remote client, the validated
// capability registry and the configuration. Components are handed Arc clones
// instead of building clients per call. `shutdown` cancels the root token that
// every dispatcher derives its own token from.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::capabilities::CapabilityRegistry;
use crate::config::DocentConfig;
use crate::dispatcher::{DispatchOptions, RunDispatcher};
use crate::error::{DocentError, Result};
use crate::gateway::ConversationGateway;
use crate::knowledge::KnowledgeBase;
use crate::traits::AssistantApi;
use crate::types::RunOutcome;

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound client for capability fetches, with per-request timeouts from config.
pub fn build_http_client(config: &DocentConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.http_timeout)
        .connect_timeout(config.http_timeout.min(MAX_CONNECT_TIMEOUT))
        .build()
        .map_err(|e| DocentError::config(format!("failed to build HTTP client: {}", e)))
}

pub struct Docent {
    config: Arc<DocentConfig>,
    api: Arc<dyn AssistantApi>,
    registry: Arc<CapabilityRegistry>,
    shutdown: CancellationToken,
}

impl Docent {
    /// Initialize with the default capabilities.
    pub fn init(config: DocentConfig, api: Arc<dyn AssistantApi>) -> Result<Self> {
        config.validate()?;
        let http = build_http_client(&config)?;
        let registry = CapabilityRegistry::with_defaults(&config, http);
        Self::with_registry(config, api, registry)
    }

    /// Initialize with a custom registry; the registry is validated first.
    pub fn with_registry(
        config: DocentConfig,
        api: Arc<dyn AssistantApi>,
        registry: CapabilityRegistry,
    ) -> Result<Self> {
        registry.validate()?;
        info!(capabilities = ?registry.names(), model = %config.model, "Docent initialized");

        Ok(Self {
            config: Arc::new(config),
            api,
            registry: Arc::new(registry),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &DocentConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn api(&self) -> &Arc<dyn AssistantApi> {
        &self.api
    }

    /// A dispatcher whose cancellation follows shutdown
    pub fn dispatcher(&self) -> RunDispatcher {
        RunDispatcher::new(
            self.api.clone(),
            self.registry.clone(),
            DispatchOptions::from(self.config.as_ref()),
        )
        .with_cancellation(self.shutdown.child_token())
    }

    pub fn gateway(&self) -> ConversationGateway {
        ConversationGateway::new(self.api.clone())
    }

    pub fn knowledge(&self) -> KnowledgeBase {
        KnowledgeBase::new(
            self.api.clone(),
            self.registry.clone(),
            self.config.clone(),
        )
    }

    /// Add `prompt` to an existing thread and run the assistant on it.
    pub async fn ask(&self, thread_id: &str, assistant_id: &str, prompt: &str) -> Result<RunOutcome> {
        self.gateway().add_message(thread_id, prompt).await?;
        self.dispatcher().run(thread_id, assistant_id).await
    }

    /// Start a new thread on `vector_store_id` with `prompt` and run the assistant on it.
    pub async fn ask_new(
        &self,
        assistant_id: &str,
        vector_store_id: &str,
        prompt: &str,
    ) -> Result<RunOutcome> {
        let thread_id = self.gateway().start_thread(prompt, vector_store_id).await?;
        self.dispatcher().run(&thread_id, assistant_id).await
    }

    /// Cancel every in-flight and future dispatch from this context.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Docent shutting down");
            self.shutdown.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token cancelled by `shutdown`
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
