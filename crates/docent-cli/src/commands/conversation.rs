// Conversation commands: ask and history

use crate::output::{print_field, print_messages, OutputFormat};
use anyhow::Result;
use docent_core::Docent;

pub enum Target {
    NewThread { vector_store_id: String },
    Thread { thread_id: String },
}

pub async fn ask(
    docent: &Docent,
    output: OutputFormat,
    assistant_id: &str,
    target: Target,
    prompt: &str,
) -> Result<()> {
    let outcome = match target {
        Target::NewThread { vector_store_id } => {
            docent.ask_new(assistant_id, &vector_store_id, prompt).await?
        }
        Target::Thread { thread_id } => docent.ask(&thread_id, assistant_id, prompt).await?,
    };

    if output.is_text() {
        print_field("Thread", &outcome.run.thread_id);
        print_field("Run", &outcome.run.id);
        print_field("Status", outcome.status().as_str());
        println!();
        print_messages(&outcome.messages);
    } else {
        output.print_value(&outcome)?;
    }

    if !outcome.is_success() {
        let reason = outcome
            .run
            .last_error
            .as_ref()
            .map(|e| format!(": {} ({})", e.message, e.code))
            .unwrap_or_default();
        anyhow::bail!("Run ended with status {}{}", outcome.status(), reason);
    }
    Ok(())
}

pub async fn history(docent: &Docent, output: OutputFormat, thread_id: &str) -> Result<()> {
    let messages = docent.gateway().messages(thread_id).await?;

    if output.is_text() {
        print_messages(&messages);
    } else {
        output.print_value(&messages)?;
    }
    Ok(())
}
