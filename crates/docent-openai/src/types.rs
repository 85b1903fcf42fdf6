// OpenAI Assistants v2 wire types
//
// Request bodies and response objects as the REST API shapes them, with
// conversions into the reduced docent-core types.

use chrono::{DateTime, TimeZone, Utc};
use docent_core::{
    AssistantSpec, CallbackRequest, CallbackResult, Message, MessageRole, RequiredAction, Run,
    RunError, RunStatus, ToolSpec,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateVectorStoreRequest<'a> {
    pub name: &'a str,
    pub file_ids: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool entry in an assistant definition
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantTool {
    FileSearch,
    CodeInterpreter,
    Function { function: FunctionDefinition },
}

impl From<&ToolSpec> for AssistantTool {
    fn from(spec: &ToolSpec) -> Self {
        match spec {
            ToolSpec::FileSearch => AssistantTool::FileSearch,
            ToolSpec::CodeInterpreter => AssistantTool::CodeInterpreter,
            ToolSpec::Function {
                name,
                description,
                parameters,
            } => AssistantTool::Function {
                function: FunctionDefinition {
                    name: name.clone(),
                    description: description.clone(),
                    parameters: parameters.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSearchResources {
    pub vector_store_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResources {
    pub file_search: FileSearchResources,
}

impl ToolResources {
    pub fn file_search(vector_store_ids: Vec<String>) -> Self {
        Self {
            file_search: FileSearchResources { vector_store_ids },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAssistantRequest {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<AssistantTool>,
    pub tool_resources: ToolResources,
}

impl From<&AssistantSpec> for CreateAssistantRequest {
    fn from(spec: &AssistantSpec) -> Self {
        Self {
            name: spec.name.clone(),
            instructions: spec.instructions.clone(),
            model: spec.model.clone(),
            tools: spec.tools.iter().map(AssistantTool::from).collect(),
            tool_resources: ToolResources::file_search(spec.vector_store_ids.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateThreadRequest<'a> {
    pub messages: Vec<NewMessage<'a>>,
    pub tool_resources: ToolResources,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitToolOutputsRequest<'a> {
    pub tool_outputs: &'a [CallbackResult],
}

// =============================================================================
// Responses
// =============================================================================

/// Any object the API creates, reduced to its id
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectId {
    pub id: String,
}

/// Paginated list wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON text exactly as the model produced it
    pub arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireRequiredAction {
    pub submit_tool_outputs: Option<SubmitToolOutputs>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireRunError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireRun {
    pub id: String,
    pub thread_id: String,
    pub assistant_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<WireRequiredAction>,
    #[serde(default)]
    pub last_error: Option<WireRunError>,
}

impl From<WireRun> for Run {
    fn from(wire: WireRun) -> Self {
        let required_action = wire
            .required_action
            .and_then(|action| action.submit_tool_outputs)
            .map(|submit| RequiredAction {
                tool_calls: submit
                    .tool_calls
                    .into_iter()
                    .map(|call| CallbackRequest::new(call.id, call.function.name, call.function.arguments))
                    .collect(),
            });

        Run {
            id: wire.id,
            thread_id: wire.thread_id,
            assistant_id: wire.assistant_id,
            status: wire.status,
            required_action,
            last_error: wire.last_error.map(|e| RunError {
                code: e.code,
                message: e.message,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<ContentPart>,
    /// Unix seconds
    pub created_at: i64,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        let content = wire
            .content
            .into_iter()
            .find_map(|part| match part {
                ContentPart::Text { text } => Some(text.value),
                ContentPart::Other => None,
            })
            .unwrap_or_default();

        Message {
            id: wire.id,
            role: wire.role,
            content,
            created_at: unix_seconds(wire.created_at),
        }
    }
}

fn unix_seconds(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
