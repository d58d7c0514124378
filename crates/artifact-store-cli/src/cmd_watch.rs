use anyhow::{Context, Result};
use artifact_store::ArtifactStore;
use tokio::sync::broadcast::error::RecvError;

pub async fn run(store: &ArtifactStore) -> Result<()> {
    let mut events = store.subscribe();
    let watch = store.watch().context("Failed to start watcher")?;
    eprintln!("Watching {} (Ctrl-C to stop)", store.root().display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                break;
            }

            event = events.recv() => {
                match event {
                    Ok(event) => println!("{}", serde_json::to_string(&event)?),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event stream lagged; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    watch.stop().await;
    Ok(())
}
