// In-memory assistant service for examples and testing
//
// InMemoryAssistantApi plays the remote service from a script. Every call that
// observes a run (create_run, get_run, submit_tool_outputs) consumes the next
// scripted step; once the script is exhausted the run keeps its last status.
//
// It enforces the callback protocol the way the real service does: outputs can
// only be submitted while a run requires action, and the batch must answer
// exactly the pending call ids.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{DocentError, Result};
use crate::traits::AssistantApi;
use crate::types::{
    AssistantSpec, CallbackRequest, CallbackResult, Message, MessageRole, RequiredAction, Run,
    RunError, RunStatus,
};

/// One scripted observation of a run
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Report this status (no side effects)
    Status(RunStatus),
    /// Require these callbacks to be answered
    Callbacks(Vec<CallbackRequest>),
    /// Complete the run, appending an assistant reply to the thread
    Complete(String),
    /// Fail the run with an error
    Fail { code: String, message: String },
}

#[derive(Debug, Default)]
struct State {
    threads: HashMap<String, Vec<Message>>,
    thread_stores: HashMap<String, String>,
    runs: HashMap<String, Run>,
    script: VecDeque<ScriptStep>,
    submissions: Vec<(String, Vec<CallbackResult>)>,
    cancelled: Vec<String>,
    assistants: Vec<AssistantSpec>,
    vector_stores: HashMap<String, Vec<String>>,
    files: HashMap<String, String>,
    run_observations: usize,
}

/// Scripted in-memory implementation of `AssistantApi`
#[derive(Debug, Default, Clone)]
pub struct InMemoryAssistantApi {
    state: Arc<Mutex<State>>,
}

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::now_v7().simple())
}

impl InMemoryAssistantApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a script of run observations
    pub fn with_script(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        let state = State {
            script: steps.into_iter().collect(),
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Append steps to the script
    pub async fn push_steps(&self, steps: impl IntoIterator<Item = ScriptStep>) {
        self.state.lock().await.script.extend(steps);
    }

    /// Pre-populate a thread with messages (oldest first)
    pub async fn seed_thread(&self, messages: Vec<Message>) -> String {
        let id = new_id("thread");
        self.state.lock().await.threads.insert(id.clone(), messages);
        id
    }

    /// Every accepted callback batch, in submission order
    pub async fn submissions(&self) -> Vec<(String, Vec<CallbackResult>)> {
        self.state.lock().await.submissions.clone()
    }

    /// Run ids the dispatcher asked to cancel
    pub async fn cancelled_runs(&self) -> Vec<String> {
        self.state.lock().await.cancelled.clone()
    }

    pub async fn assistants(&self) -> Vec<AssistantSpec> {
        self.state.lock().await.assistants.clone()
    }

    pub async fn vector_store_files(&self, vector_store_id: &str) -> Option<Vec<String>> {
        self.state
            .lock()
            .await
            .vector_stores
            .get(vector_store_id)
            .cloned()
    }

    /// Knowledge store a thread was bound to at creation
    pub async fn thread_store(&self, thread_id: &str) -> Option<String> {
        self.state.lock().await.thread_stores.get(thread_id).cloned()
    }

    /// Thread messages, oldest first
    pub async fn thread_messages(&self, thread_id: &str) -> Option<Vec<Message>> {
        self.state.lock().await.threads.get(thread_id).cloned()
    }

    /// Number of times a run state was observed (create, poll, submit)
    pub async fn run_observations(&self) -> usize {
        self.state.lock().await.run_observations
    }

    fn advance(state: &mut State, run_id: &str) -> Result<Run> {
        state.run_observations += 1;
        let step = state.script.pop_front();
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| DocentError::api(404, format!("No run found with id '{}'", run_id)))?;

        let mut reply = None;
        match step {
            None => {}
            Some(ScriptStep::Status(status)) => {
                run.status = status;
                run.required_action = None;
            }
            Some(ScriptStep::Callbacks(calls)) => {
                run.status = RunStatus::RequiresAction;
                run.required_action = Some(RequiredAction { tool_calls: calls });
            }
            Some(ScriptStep::Complete(text)) => {
                run.status = RunStatus::Completed;
                run.required_action = None;
                reply = Some(text);
            }
            Some(ScriptStep::Fail { code, message }) => {
                run.status = RunStatus::Failed;
                run.required_action = None;
                run.last_error = Some(RunError { code, message });
            }
        }
        let run = run.clone();

        if let Some(text) = reply {
            if let Some(messages) = state.threads.get_mut(&run.thread_id) {
                messages.push(Message {
                    id: new_id("msg"),
                    role: MessageRole::Assistant,
                    content: text,
                    created_at: Utc::now(),
                });
            }
        }
        Ok(run)
    }

    fn thread_not_found(thread_id: &str) -> DocentError {
        DocentError::api(404, format!("No thread found with id '{}'", thread_id))
    }
}

#[async_trait]
impl AssistantApi for InMemoryAssistantApi {
    async fn upload_file(&self, path: &Path) -> Result<String> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(DocentError::api(400, format!("{} is not a file", path.display())));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let id = new_id("file");
        self.state.lock().await.files.insert(id.clone(), name);
        Ok(id)
    }

    async fn create_vector_store(&self, _name: &str, file_ids: &[String]) -> Result<String> {
        let mut state = self.state.lock().await;
        if let Some(missing) = file_ids.iter().find(|id| !state.files.contains_key(*id)) {
            return Err(DocentError::api(404, format!("No file found with id '{}'", missing)));
        }
        let id = new_id("vs");
        state.vector_stores.insert(id.clone(), file_ids.to_vec());
        Ok(id)
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String> {
        self.state.lock().await.assistants.push(spec.clone());
        Ok(new_id("asst"))
    }

    async fn create_thread(&self, prompt: &str, vector_store_id: &str) -> Result<String> {
        let id = new_id("thread");
        let mut state = self.state.lock().await;
        state
            .threads
            .insert(id.clone(), vec![Message::user(new_id("msg"), prompt)]);
        state
            .thread_stores
            .insert(id.clone(), vector_store_id.to_string());
        Ok(id)
    }

    async fn add_message(&self, thread_id: &str, role: MessageRole, content: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let messages = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| Self::thread_not_found(thread_id))?;
        messages.push(Message {
            id: new_id("msg"),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let state = self.state.lock().await;
        let messages = state
            .threads
            .get(thread_id)
            .ok_or_else(|| Self::thread_not_found(thread_id))?;
        Ok(messages.iter().rev().cloned().collect())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let mut state = self.state.lock().await;
        if !state.threads.contains_key(thread_id) {
            return Err(Self::thread_not_found(thread_id));
        }
        let run = Run {
            id: new_id("run"),
            thread_id: thread_id.to_string(),
            assistant_id: assistant_id.to_string(),
            status: RunStatus::Queued,
            required_action: None,
            last_error: None,
        };
        let run_id = run.id.clone();
        state.runs.insert(run_id.clone(), run);
        Self::advance(&mut state, &run_id)
    }

    async fn get_run(&self, _thread_id: &str, run_id: &str) -> Result<Run> {
        let mut state = self.state.lock().await;
        Self::advance(&mut state, run_id)
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        run_id: &str,
        outputs: &[CallbackResult],
    ) -> Result<Run> {
        let mut state = self.state.lock().await;
        let run = state
            .runs
            .get(run_id)
            .ok_or_else(|| DocentError::api(404, format!("No run found with id '{}'", run_id)))?;

        if run.status != RunStatus::RequiresAction {
            return Err(DocentError::api(
                400,
                format!("Run {} is not awaiting tool outputs", run_id),
            ));
        }

        let pending: HashSet<&str> = run.pending_callbacks().iter().map(|c| c.id.as_str()).collect();
        let answered: HashSet<&str> = outputs.iter().map(|o| o.tool_call_id.as_str()).collect();
        if pending != answered || outputs.len() != pending.len() {
            return Err(DocentError::api(
                400,
                "Expected tool outputs for every pending call id",
            ));
        }

        state
            .submissions
            .push((run_id.to_string(), outputs.to_vec()));
        if let Some(run) = state.runs.get_mut(run_id) {
            run.status = RunStatus::Queued;
            run.required_action = None;
        }
        Self::advance(&mut state, run_id)
    }

    async fn cancel_run(&self, _thread_id: &str, run_id: &str) -> Result<Run> {
        let mut state = self.state.lock().await;
        state.cancelled.push(run_id.to_string());
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| DocentError::api(404, format!("No run found with id '{}'", run_id)))?;
        run.status = RunStatus::Cancelled;
        run.required_action = None;
        Ok(run.clone())
    }
}
