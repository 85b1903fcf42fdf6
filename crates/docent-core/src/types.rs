// Domain types for remote runs, callbacks and messages
//
// Design Decision: These mirror what the assistant service reports, reduced to
// the fields the dispatcher actually reads. Wire formats live in the provider crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a remote run, as reported by the assistant service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// The dispatcher keeps polling while the run is in one of these states
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling
        )
    }

    /// No further progress is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reported by the service on a failed run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunError {
    pub code: String,
    pub message: String,
}

/// One execution attempt of an assistant against a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub assistant_id: String,
    pub status: RunStatus,
    /// Pending callbacks; only present while status is `requires_action`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<RunError>,
}

impl Run {
    /// Callbacks the run is blocked on (empty unless `requires_action`)
    pub fn pending_callbacks(&self) -> &[CallbackRequest] {
        match (&self.status, &self.required_action) {
            (RunStatus::RequiresAction, Some(action)) => &action.tool_calls,
            _ => &[],
        }
    }
}

/// The batch of callbacks a run needs answered before it can resume
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequiredAction {
    pub tool_calls: Vec<CallbackRequest>,
}

/// One pending invocation demanded by a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallbackRequest {
    /// Unique call id; the matching result must carry it back
    pub id: String,
    /// Capability name requested by the model
    pub name: String,
    /// Raw, unvalidated JSON argument text
    pub arguments: String,
}

impl CallbackRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Output submitted for one callback request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallbackResult {
    pub tool_call_id: String,
    pub output: String,
}

/// Message role in a thread
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A thread message reduced to its first text part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Reorder a newest-first listing into chronological order.
///
/// The service lists messages newest-first; callers always get oldest-first.
pub fn chronological(mut newest_first: Vec<Message>) -> Vec<Message> {
    newest_first.reverse();
    newest_first
}

/// Tool attached to an assistant definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolSpec {
    FileSearch,
    CodeInterpreter,
    Function {
        name: String,
        description: String,
        parameters: serde_json::Value,
    },
}

/// Everything needed to create an assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSpec {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<ToolSpec>,
    /// Knowledge stores bound for file search
    pub vector_store_ids: Vec<String>,
}

/// Terminal result of a dispatched run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run: Run,
    /// Thread history, oldest first
    pub messages: Vec<Message>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.run.status.is_success()
    }

    pub fn status(&self) -> RunStatus {
        self.run.status
    }

    /// Newest assistant message, if any
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
    }
}
