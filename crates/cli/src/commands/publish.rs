//! `publish` command implementation.

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::info;

use contracts::Item;
use pubcontrol::{PubControl, PublishCallback, SharedError, ValueFormat};

use crate::cli::{PublishArgs, PublishMode};

/// Execute the `publish` command
pub async fn run_publish(args: &PublishArgs) -> Result<()> {
    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let item = build_item(args)?;
    let pub_control = PubControl::new(&config).context("Failed to build publisher")?;
    let endpoint_count = pub_control.client_count().await;

    info!(
        channel = %args.channel,
        mode = ?args.mode,
        endpoints = endpoint_count,
        "Publishing"
    );

    let result: Result<()> = match args.mode {
        PublishMode::Sequential => pub_control
            .publish(&args.channel, &item)
            .await
            .map_err(Into::into),
        PublishMode::Parallel => pub_control
            .publish_parallel(&args.channel, &item)
            .await
            .map_err(Into::into),
        PublishMode::Async => {
            let (tx, rx) = oneshot::channel();
            let callback: PublishCallback = Box::new(move |result: Result<(), SharedError>| {
                let _ = tx.send(result);
            });
            let queued = pub_control
                .publish_async(&args.channel, &item, Some(callback))
                .await;
            pub_control.finish().await;
            match queued {
                Ok(()) => rx
                    .await
                    .context("Publish callback was dropped")?
                    .map_err(|e| anyhow::anyhow!("{e}")),
                Err(e) => Err(e.into()),
            }
        }
    };

    if args.stats {
        print_stats(&pub_control).await;
    }

    result.with_context(|| format!("Failed to publish to channel '{}'", args.channel))?;
    println!(
        "✓ Published to channel '{}' on {} endpoint(s)",
        args.channel, endpoint_count
    );
    Ok(())
}

fn build_item(args: &PublishArgs) -> Result<Item> {
    let value: Value = serde_json::from_str(&args.data).context("--data is not valid JSON")?;

    let mut item = Item::single(ValueFormat::new(args.format.clone(), value));
    if let Some(ref id) = args.id {
        item = item.with_id(id.clone());
    }
    if let Some(ref prev_id) = args.prev_id {
        item = item.with_prev_id(prev_id.clone());
    }
    Ok(item)
}

async fn print_stats(pub_control: &PubControl) {
    println!("\nEndpoint counters:");
    for client in pub_control.clients().await {
        let snapshot = client.metrics().snapshot();
        println!(
            "  {} [{}] calls={} published={} failed={}",
            client.uri(),
            client.auth_kind(),
            snapshot.call_count,
            snapshot.published_count,
            snapshot.failure_count
        );
    }
}
