use anyhow::{Context, Result};
use artifact_store::{Actor, ArtifactStore, WriteOptions, WriteOutcome};
use std::io::{self, Read};

#[derive(Debug)]
pub struct WriteArgs {
    pub path: String,
    pub actor: Actor,
    pub reason: String,
    pub tool_call_id: Option<String>,
    pub no_snapshot: bool,
}

impl WriteArgs {
    pub(crate) fn options(&self) -> WriteOptions {
        let mut opts = WriteOptions::new(self.actor, self.reason.clone());
        if self.no_snapshot {
            opts = opts.without_snapshot();
        }
        if let Some(id) = &self.tool_call_id {
            opts = opts.with_tool_call_id(id.clone());
        }
        opts
    }
}

pub async fn run(store: &ArtifactStore, args: WriteArgs, pretty: bool) -> Result<()> {
    let mut content = Vec::new();
    io::stdin()
        .read_to_end(&mut content)
        .context("Failed to read content from stdin")?;

    let outcome = write_content(store, &args, content).await?;
    println!("{}", to_json(&outcome, pretty)?);
    Ok(())
}

async fn write_content(
    store: &ArtifactStore,
    args: &WriteArgs,
    content: Vec<u8>,
) -> Result<WriteOutcome> {
    store
        .write(&args.path, content, args.options())
        .await
        .with_context(|| format!("Failed to write {}", args.path))
}

pub(crate) fn to_json(outcome: &WriteOutcome, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(outcome)?
    } else {
        serde_json::to_string(outcome)?
    })
}
