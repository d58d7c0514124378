use anyhow::{Context, Result};
use crate::cmd_write::WriteArgs;
use artifact_store::{ArtifactStore, BackupEntry};

pub async fn run_list(store: &ArtifactStore, path: &str, json: bool) -> Result<()> {
    let entries = store
        .history(path)
        .await
        .with_context(|| format!("Failed to list history of {}", path))?;
    println!("{}", render_list(path, &entries, json)?);
    Ok(())
}

pub async fn run_restore(
    store: &ArtifactStore,
    args: &WriteArgs,
    version: &str,
    pretty: bool,
) -> Result<()> {
    let outcome = store
        .restore(&args.path, version, args.options())
        .await
        .with_context(|| format!("Failed to restore {} to {}", args.path, version))?;
    println!("{}", crate::cmd_write::to_json(&outcome, pretty)?);
    Ok(())
}

fn render_list(path: &str, entries: &[BackupEntry], json: bool) -> Result<String> {
    if json {
        let items: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "version": e.version,
                    "size_bytes": e.size_bytes,
                    "path": e.path,
                })
            })
            .collect();
        let output = serde_json::json!({
            "artifact": path,
            "backups": items,
        });
        return Ok(serde_json::to_string_pretty(&output)?);
    }

    let mut out = format!("History of {}:\n", path);
    if entries.is_empty() {
        out.push_str("  (no backups)");
    } else {
        let lines: Vec<String> = entries
            .iter()
            .map(|e| format!("  {}  {:>8} bytes", e.version, e.size_bytes))
            .collect();
        out.push_str(&lines.join("\n"));
    }
    Ok(out)
}
