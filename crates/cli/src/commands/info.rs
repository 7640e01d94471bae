//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::PubControlConfig;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    timeout_ms: u64,
    user_agent: String,
    endpoints: Vec<EndpointInfo>,
}

/// Key material is never included
#[derive(Serialize)]
struct EndpointInfo {
    uri: String,
    auth: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let info = build_config_info(&config);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &PubControlConfig) -> ConfigInfo {
    let endpoints = config
        .endpoints
        .iter()
        .filter_map(|entry| {
            let uri = entry.uri.clone()?;
            Some(EndpointInfo {
                uri,
                auth: super::auth_mode(entry),
                iss: entry.iss.clone(),
            })
        })
        .collect();

    ConfigInfo {
        timeout_ms: config.client.timeout_ms,
        user_agent: config.client.user_agent.clone(),
        endpoints,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("pubcontrol configuration\n");
    println!("Client");
    println!("   ├─ Timeout: {} ms", info.timeout_ms);
    println!("   └─ User agent: {}", info.user_agent);

    println!("\nEndpoints ({})", info.endpoints.len());
    for (i, endpoint) in info.endpoints.iter().enumerate() {
        let prefix = if i == info.endpoints.len() - 1 { "└─" } else { "├─" };
        match endpoint.iss {
            Some(ref iss) => println!("   {} {} ({}, iss={})", prefix, endpoint.uri, endpoint.auth, iss),
            None => println!("   {} {} ({})", prefix, endpoint.uri, endpoint.auth),
        }
    }

    println!();
}
