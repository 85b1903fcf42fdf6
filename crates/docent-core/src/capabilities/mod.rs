// Capability Abstraction for Run Dispatch
//
// A capability is a locally executed callback the remote assistant can request
// by name. Capabilities are registered once in a `CapabilityRegistry`, validated
// at startup, and resolved by name for every callback request.
//
// Design decisions:
// - Capabilities are defined via a trait (name, description, schema, execute)
// - Results are values, never errors: the remote run needs an output string for
//   every pending call before it can resume
// - Required arguments are read from the declared JSON schema, not hand-coded

mod news;
mod scrape;

pub use news::{format_article, Article, ArticleSource, NewsCapability, NewsResponse};
pub use scrape::{extract_paragraphs, render_document, ScrapeCapability};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::config::DocentConfig;
use crate::error::{DocentError, Result};
use crate::types::{CallbackResult, ToolSpec};

// ============================================================================
// Capability Result - Error Handling Contract
// ============================================================================

/// Result of executing a capability.
///
/// - `Success`: output string is returned to the run as-is
/// - `ToolError`: expected, caller-facing problem (bad URL, missing field)
/// - `Failed`: the handler itself failed (network error, bad upstream body);
///   reported as "Error during execution of <name>: <message>"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityResult {
    Success(String),
    ToolError(String),
    Failed(String),
}

impl CapabilityResult {
    pub fn success(output: impl Into<String>) -> Self {
        CapabilityResult::Success(output.into())
    }

    pub fn tool_error(message: impl Into<String>) -> Self {
        CapabilityResult::ToolError(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        CapabilityResult::Failed(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CapabilityResult::Success(_))
    }

    /// Render as the output string submitted back to the run
    pub fn into_output(self, capability: &str) -> String {
        match self {
            CapabilityResult::Success(output) => output,
            CapabilityResult::ToolError(message) => message,
            CapabilityResult::Failed(message) => {
                tracing::warn!(capability = %capability, error = %message, "Capability failed");
                format!("Error during execution of {}: {}", capability, message)
            }
        }
    }

    pub fn into_callback_result(self, tool_call_id: &str, capability: &str) -> CallbackResult {
        CallbackResult {
            tool_call_id: tool_call_id.to_string(),
            output: self.into_output(capability),
        }
    }
}

// ============================================================================
// Capability Trait
// ============================================================================

/// A locally executed callback the assistant can request.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Unique name the assistant uses to request this capability.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Execute with already-parsed, already-validated arguments.
    async fn execute(&self, arguments: Value) -> CapabilityResult;

    /// Fields listed under `required` in the schema.
    fn required_arguments(&self) -> Vec<String> {
        self.parameters_schema()
            .get("required")
            .and_then(|v| v.as_array())
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Function tool declaration for assistant creation.
    fn to_tool_spec(&self) -> ToolSpec {
        ToolSpec::Function {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

// ============================================================================
// CapabilityRegistry
// ============================================================================

/// Name → capability table, immutable once built.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    capabilities: BTreeMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `get_news` and `scrape_website`, sharing one HTTP client.
    pub fn with_defaults(config: &DocentConfig, http: reqwest::Client) -> Self {
        CapabilityRegistry::builder()
            .capability(NewsCapability::new(http.clone(), config))
            .capability(ScrapeCapability::new(http))
            .build()
    }

    /// Register a capability. A capability with the same name is replaced.
    pub fn register(&mut self, capability: impl Capability + 'static) {
        self.capabilities
            .insert(capability.name().to_string(), Arc::new(capability));
    }

    pub fn register_arc(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities
            .insert(capability.name().to_string(), capability);
    }

    /// Look up a capability by the name the assistant requested.
    pub fn resolve(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.capabilities.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Capability>> {
        self.capabilities.values()
    }

    /// Function tool declarations for every registered capability, sorted by name.
    pub fn function_tools(&self) -> Vec<ToolSpec> {
        self.capabilities.values().map(|c| c.to_tool_spec()).collect()
    }

    /// Check every declared schema before the registry is put to use.
    ///
    /// A capability whose schema is not an object, or whose `required`
    /// fields are not declared under `properties`, would make the
    /// missing-argument check disagree with what the model was told.
    pub fn validate(&self) -> Result<()> {
        for (name, capability) in &self.capabilities {
            if name.trim().is_empty() {
                return Err(DocentError::registry("capability name must not be empty"));
            }
            if capability.name() != name {
                return Err(DocentError::registry(format!(
                    "capability registered as '{}' reports name '{}'",
                    name,
                    capability.name()
                )));
            }

            let schema = capability.parameters_schema();
            if schema.get("type").and_then(|t| t.as_str()) != Some("object") {
                return Err(DocentError::registry(format!(
                    "{}: parameter schema must have type 'object'",
                    name
                )));
            }

            let properties = schema
                .get("properties")
                .and_then(|p| p.as_object())
                .ok_or_else(|| {
                    DocentError::registry(format!("{}: parameter schema has no properties", name))
                })?;

            if let Some(required) = schema.get("required") {
                let required = required.as_array().ok_or_else(|| {
                    DocentError::registry(format!("{}: 'required' must be an array", name))
                })?;
                let mut seen = HashSet::new();
                for field in required {
                    let field = field.as_str().ok_or_else(|| {
                        DocentError::registry(format!(
                            "{}: 'required' entries must be strings",
                            name
                        ))
                    })?;
                    if !properties.contains_key(field) {
                        return Err(DocentError::registry(format!(
                            "{}: required argument '{}' is not declared in properties",
                            name, field
                        )));
                    }
                    if !seen.insert(field) {
                        return Err(DocentError::registry(format!(
                            "{}: required argument '{}' listed twice",
                            name, field
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::new()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .finish()
    }
}

/// Builder for creating a CapabilityRegistry with a fluent API.
pub struct CapabilityRegistryBuilder {
    registry: CapabilityRegistry,
}

impl CapabilityRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: CapabilityRegistry::new(),
        }
    }

    pub fn capability(mut self, capability: impl Capability + 'static) -> Self {
        self.registry.register(capability);
        self
    }

    pub fn capability_arc(mut self, capability: Arc<dyn Capability>) -> Self {
        self.registry.register_arc(capability);
        self
    }

    pub fn build(self) -> CapabilityRegistry {
        self.registry
    }
}

impl Default for CapabilityRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
