// Knowledge base commands: document upload and assistant creation

use crate::output::{print_field, OutputFormat};
use anyhow::{Context, Result};
use docent_core::Docent;
use serde_json::json;
use std::path::{Path, PathBuf};

pub async fn upload(docent: &Docent, output: OutputFormat, path: &Path) -> Result<()> {
    let file_id = docent
        .knowledge()
        .upload_document(path)
        .await
        .with_context(|| format!("Failed to upload {}", path.display()))?;

    if output.is_text() {
        print_field("File ID", &file_id);
    } else {
        output.print_value(&json!({ "file_id": file_id }))?;
    }
    Ok(())
}

pub async fn create_assistant(
    docent: &Docent,
    output: OutputFormat,
    title: &str,
    mut file_ids: Vec<String>,
    uploads: Vec<PathBuf>,
) -> Result<()> {
    let knowledge = docent.knowledge();

    for path in &uploads {
        let file_id = knowledge
            .upload_document(path)
            .await
            .with_context(|| format!("Failed to upload {}", path.display()))?;
        file_ids.push(file_id);
    }

    let handle = knowledge.create_assistant(title, &file_ids).await?;

    if output.is_text() {
        print_field("Assistant ID", &handle.assistant_id);
        print_field("Vector store", &handle.vector_store_id);
        print_field("Files", &file_ids.len().to_string());
    } else {
        output.print_value(&handle)?;
    }
    Ok(())
}
