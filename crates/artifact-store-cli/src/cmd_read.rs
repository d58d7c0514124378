use anyhow::{Context, Result};
use artifact_store::ArtifactStore;
use std::io::Write;

pub async fn run(store: &ArtifactStore, path: &str) -> Result<()> {
    let content = store
        .read(path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&content)?;
    stdout.flush()?;
    Ok(())
}
