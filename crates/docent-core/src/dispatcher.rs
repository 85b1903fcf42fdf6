// Run dispatcher
//
// Drives one remote run to a terminal status:
//   create run → poll while transient → on requires_action resolve every pending
//   callback and submit the whole batch at once → poll again → list messages.
//
// Every failure inside a callback becomes an output string. The remote run
// cannot resume until each pending call is answered, so raising instead would
// leave it stuck in requires_action.
//
// The loop is bounded by `max_wait` and observes a CancellationToken at every
// wait point. Both paths make a best-effort remote cancel before returning.

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::capabilities::CapabilityRegistry;
use crate::config::DocentConfig;
use crate::error::{DocentError, Result};
use crate::traits::AssistantApi;
use crate::types::{chronological, CallbackRequest, CallbackResult, Run, RunOutcome, RunStatus};

/// Polling parameters for a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            max_wait: Duration::from_secs(300),
        }
    }
}

impl From<&DocentConfig> for DispatchOptions {
    fn from(config: &DocentConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            max_wait: config.max_wait,
        }
    }
}

pub struct RunDispatcher {
    api: Arc<dyn AssistantApi>,
    registry: Arc<CapabilityRegistry>,
    options: DispatchOptions,
    cancel: CancellationToken,
}

impl RunDispatcher {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        registry: Arc<CapabilityRegistry>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            api,
            registry,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe `token` instead of a private one
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    /// Start a run of `assistant_id` on `thread_id` and drive it to a terminal status.
    ///
    /// Non-success terminal statuses (failed, cancelled, expired, incomplete) are
    /// returned in the outcome unchanged; nothing is retried.
    pub async fn run(&self, thread_id: &str, assistant_id: &str) -> Result<RunOutcome> {
        if self.cancel.is_cancelled() {
            return Err(DocentError::Cancelled);
        }

        let deadline = Instant::now()
            .checked_add(self.options.max_wait)
            .ok_or_else(|| {
                DocentError::config(format!(
                    "max wait {:?} is out of range",
                    self.options.max_wait
                ))
            })?;
        let run = self.api.create_run(thread_id, assistant_id).await?;
        info!(
            thread_id = %run.thread_id,
            run_id = %run.id,
            status = %run.status,
            "Run created"
        );

        let run = self.drive(run, deadline).await?;
        if run.status.is_success() {
            info!(thread_id = %run.thread_id, run_id = %run.id, "Run completed");
        } else {
            warn!(
                thread_id = %run.thread_id,
                run_id = %run.id,
                status = %run.status,
                error = ?run.last_error,
                "Run ended without completing"
            );
        }

        let messages = chronological(self.api.list_messages(&run.thread_id).await?);
        Ok(RunOutcome { run, messages })
    }

    async fn drive(&self, mut run: Run, deadline: Instant) -> Result<Run> {
        loop {
            run = self.wait_while_transient(run, deadline).await?;

            match run.status {
                RunStatus::RequiresAction => {
                    let requests = run.pending_callbacks().to_vec();
                    if requests.is_empty() {
                        return Err(DocentError::dispatch(format!(
                            "run {} requires action but reported no callbacks",
                            run.id
                        )));
                    }

                    info!(
                        run_id = %run.id,
                        callbacks = requests.len(),
                        "Run requires action"
                    );

                    let results = self
                        .guard(&run, deadline, self.resolve_batch(&requests))
                        .await?;
                    check_batch(&requests, &results)?;

                    run = self
                        .api
                        .submit_tool_outputs(&run.thread_id, &run.id, &results)
                        .await?;
                    debug!(run_id = %run.id, status = %run.status, "Callback outputs submitted");
                }
                status if status.is_terminal() => return Ok(run),
                // wait_while_transient only returns non-transient runs
                _ => continue,
            }
        }
    }

    async fn wait_while_transient(&self, mut run: Run, deadline: Instant) -> Result<Run> {
        while run.status.is_transient() {
            let now = Instant::now();
            if now >= deadline {
                self.abandon(&run).await;
                return Err(DocentError::Timeout(self.options.max_wait));
            }

            let wake = now
                .checked_add(self.options.poll_interval)
                .map_or(deadline, |next| next.min(deadline));
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.abandon(&run).await;
                    return Err(DocentError::Cancelled);
                }
                _ = tokio::time::sleep_until(wake) => {}
            }

            run = self.guard(&run, deadline, self.api.get_run(&run.thread_id, &run.id))
                .await??;
            debug!(run_id = %run.id, status = %run.status, "Polled run");
        }
        Ok(run)
    }

    /// Race `fut` against cancellation and the deadline.
    async fn guard<T>(
        &self,
        run: &Run,
        deadline: Instant,
        fut: impl std::future::Future<Output = T>,
    ) -> Result<T> {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                self.abandon(run).await;
                Err(DocentError::Cancelled)
            }
            _ = tokio::time::sleep_until(deadline) => {
                self.abandon(run).await;
                Err(DocentError::Timeout(self.options.max_wait))
            }
            value = fut => Ok(value),
        }
    }

    /// Best-effort remote cancel so the service does not keep the run alive.
    async fn abandon(&self, run: &Run) {
        if run.status.is_terminal() {
            return;
        }
        warn!(thread_id = %run.thread_id, run_id = %run.id, "Abandoning run");
        if let Err(e) = self.api.cancel_run(&run.thread_id, &run.id).await {
            warn!(run_id = %run.id, error = %e, "Failed to cancel run");
        }
    }

    /// Resolve a batch concurrently; results keep request order.
    pub async fn resolve_batch(&self, requests: &[CallbackRequest]) -> Vec<CallbackResult> {
        join_all(
            requests
                .iter()
                .map(|request| resolve_callback(&self.registry, request)),
        )
        .await
    }
}

/// Answer one callback request. Never fails: every problem becomes the output text.
pub async fn resolve_callback(
    registry: &CapabilityRegistry,
    request: &CallbackRequest,
) -> CallbackResult {
    let reply = |output: String| CallbackResult {
        tool_call_id: request.id.clone(),
        output,
    };

    let arguments: Value = match serde_json::from_str(&request.arguments) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => {
            return reply(format!(
                "Invalid arguments for {}: expected a JSON object",
                request.name
            ))
        }
        Err(e) => {
            warn!(tool_call_id = %request.id, capability = %request.name, error = %e, "Unparseable callback arguments");
            return reply(format!("Invalid arguments for {}: {}", request.name, e));
        }
    };

    let Some(capability) = registry.resolve(&request.name) else {
        warn!(tool_call_id = %request.id, capability = %request.name, "Unknown capability requested");
        return reply(format!("Unknown capability: {}", request.name));
    };

    for field in capability.required_arguments() {
        if arguments.get(&field).map_or(true, Value::is_null) {
            return reply(format!("Missing required argument: {}", field));
        }
    }

    debug!(tool_call_id = %request.id, capability = %request.name, "Executing capability");
    capability
        .execute(arguments)
        .await
        .into_callback_result(&request.id, &request.name)
}

/// One result per request, with matching call ids, in request order.
fn check_batch(requests: &[CallbackRequest], results: &[CallbackResult]) -> Result<()> {
    let consistent = requests.len() == results.len()
        && requests
            .iter()
            .zip(results)
            .all(|(req, res)| req.id == res.tool_call_id);
    debug_assert!(consistent, "callback batch does not match its requests");
    if consistent {
        Ok(())
    } else {
        Err(DocentError::dispatch(format!(
            "{} results for {} callback requests",
            results.len(),
            requests.len()
        )))
    }
}
