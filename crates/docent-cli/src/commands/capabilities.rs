// Local capability commands: listing and one-off invocation

use crate::output::OutputFormat;
use anyhow::Result;
use docent_core::{resolve_callback, CallbackRequest, Capability, CapabilityRegistry};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct CapabilityInfo<'a> {
    name: &'a str,
    description: &'a str,
    parameters: Value,
}

pub fn list(registry: &CapabilityRegistry, output: OutputFormat) -> Result<()> {
    let infos: Vec<CapabilityInfo<'_>> = registry
        .iter()
        .map(|c| CapabilityInfo {
            name: c.name(),
            description: c.description(),
            parameters: c.parameters_schema(),
        })
        .collect();

    if output.is_text() {
        if infos.is_empty() {
            println!("No capabilities registered");
            return Ok(());
        }
        for info in &infos {
            println!("{:<18} {}", info.name, info.description);
        }
    } else {
        output.print_value(&serde_json::json!({ "data": infos, "total": infos.len() }))?;
    }
    Ok(())
}

/// Resolve a callback locally, exactly as the dispatcher would for a run
pub async fn call(
    registry: &CapabilityRegistry,
    output: OutputFormat,
    name: &str,
    arguments: &str,
) -> Result<()> {
    let request = CallbackRequest::new("local", name, arguments);
    let result = resolve_callback(registry, &request).await;

    if output.is_text() {
        println!("{}", result.output);
    } else {
        output.print_value(&result)?;
    }
    Ok(())
}
