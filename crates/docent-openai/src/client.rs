// OpenAI Assistants client
//
// Implements the AssistantApi trait from docent-core over the Assistants v2
// REST API. Every request carries bearer auth and the `OpenAI-Beta` header.

use anyhow::Context;
use async_trait::async_trait;
use docent_core::{
    AssistantApi, AssistantSpec, CallbackResult, DocentConfig, DocentError, Message, MessageRole,
    Result, Run,
};
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tracing::debug;

use crate::types::{
    CreateAssistantRequest, CreateRunRequest, CreateThreadRequest, CreateVectorStoreRequest,
    ErrorBody, ListResponse, NewMessage, ObjectId, SubmitToolOutputsRequest, ToolResources,
    WireMessage, WireRun,
};

const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VERSION: &str = "assistants=v2";
const MESSAGE_PAGE_LIMIT: &str = "100";

pub struct OpenAiAssistantsClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAssistantsClient {
    pub fn new(api_key: impl Into<String>, base_url: &str, http: Client) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build from configuration; fails when no API key is configured
    pub fn from_config(config: &DocentConfig) -> Result<Self> {
        let api_key = config.require_openai_key()?;
        let http = docent_core::build_http_client(config)?;
        Ok(Self::new(api_key, &config.openai_base_url, http))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VERSION)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let request = self.authorized(self.http.get(self.url(path)).query(query));
        self.send(request).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.authorized(self.http.post(self.url(path)).json(body));
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let value = serde_json::from_str(&body).context("Failed to decode OpenAI response")?;
        Ok(value)
    }
}

/// Prefer the API's own error message over the raw body
fn api_error(status: StatusCode, body: &str) -> DocentError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    DocentError::api(status.as_u16(), message)
}

#[async_trait]
impl AssistantApi for OpenAiAssistantsClient {
    async fn upload_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let form = multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let request = self.authorized(self.http.post(self.url("/files")).multipart(form));
        let file: ObjectId = self.send(request).await?;
        debug!(file_id = %file.id, "Uploaded file");
        Ok(file.id)
    }

    async fn create_vector_store(&self, name: &str, file_ids: &[String]) -> Result<String> {
        let store: ObjectId = self
            .post("/vector_stores", &CreateVectorStoreRequest { name, file_ids })
            .await?;
        Ok(store.id)
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String> {
        let assistant: ObjectId = self
            .post("/assistants", &CreateAssistantRequest::from(spec))
            .await?;
        Ok(assistant.id)
    }

    async fn create_thread(&self, prompt: &str, vector_store_id: &str) -> Result<String> {
        let body = CreateThreadRequest {
            messages: vec![NewMessage {
                role: MessageRole::User.as_str(),
                content: prompt,
            }],
            tool_resources: ToolResources::file_search(vec![vector_store_id.to_string()]),
        };
        let thread: ObjectId = self.post("/threads", &body).await?;
        Ok(thread.id)
    }

    async fn add_message(&self, thread_id: &str, role: MessageRole, content: &str) -> Result<()> {
        let body = NewMessage {
            role: role.as_str(),
            content,
        };
        let _: ObjectId = self
            .post(&format!("/threads/{}/messages", thread_id), &body)
            .await?;
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let path = format!("/threads/{}/messages", thread_id);
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut query = vec![("order", "desc"), ("limit", MESSAGE_PAGE_LIMIT)];
            if let Some(cursor) = after.as_deref() {
                query.push(("after", cursor));
            }

            let page: ListResponse<WireMessage> = self.get(&path, &query).await?;
            messages.extend(page.data.into_iter().map(Message::from));

            match (page.has_more, page.last_id) {
                (true, Some(last_id)) => after = Some(last_id),
                _ => break,
            }
        }

        Ok(messages)
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let run: WireRun = self
            .post(
                &format!("/threads/{}/runs", thread_id),
                &CreateRunRequest { assistant_id },
            )
            .await?;
        Ok(run.into())
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let run: WireRun = self
            .get(&format!("/threads/{}/runs/{}", thread_id, run_id), &[])
            .await?;
        Ok(run.into())
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[CallbackResult],
    ) -> Result<Run> {
        let run: WireRun = self
            .post(
                &format!("/threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
                &SubmitToolOutputsRequest {
                    tool_outputs: outputs,
                },
            )
            .await?;
        Ok(run.into())
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let run: WireRun = self
            .post(
                &format!("/threads/{}/runs/{}/cancel", thread_id, run_id),
                &serde_json::json!({}),
            )
            .await?;
        Ok(run.into())
    }
}
