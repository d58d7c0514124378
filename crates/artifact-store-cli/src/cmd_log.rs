use anyhow::{Context, Result};
use artifact_store::{ArtifactStore, AuditRecord};

pub async fn run(store: &ArtifactStore, artifact: Option<String>, json: bool) -> Result<()> {
    let records = store
        .audit_log()
        .await
        .context("Failed to read audit log")?;
    let records = filter_records(records, artifact.as_deref());

    if json {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
    } else if records.is_empty() {
        println!("(no audit records)");
    } else {
        for record in &records {
            println!("{}", format_record(record));
        }
    }
    Ok(())
}

fn filter_records(records: Vec<AuditRecord>, artifact: Option<&str>) -> Vec<AuditRecord> {
    match artifact {
        Some(wanted) => {
            let wanted = wanted.trim_start_matches("./");
            records
                .into_iter()
                .filter(|r| r.artifact == wanted)
                .collect()
        }
        None => records,
    }
}

fn format_record(r: &AuditRecord) -> String {
    let mut line = format!(
        "{}  {:<6}  {:<5}  {}  ({} bytes)",
        r.ts, r.action, r.actor, r.artifact, r.size_bytes
    );
    if !r.reason.is_empty() {
        line.push_str(&format!("  {}", r.reason));
    }
    if let Some(id) = &r.tool_call_id {
        line.push_str(&format!("  [{}]", id));
    }
    line
}
