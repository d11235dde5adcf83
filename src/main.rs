//! manetd - proactive mesh routing daemon
//!
//! Entry point for the standalone daemon. Runs the engine against the
//! in-process channel transport; a real deployment links the library and
//! supplies the radio-facing transport itself. Outbound control traffic
//! is logged and dropped, which makes the standalone binary useful for
//! watching protocol behavior and serving the status API.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use manetd::{
    ApiSettings, Daemon, DaemonConfig, NodeId, NodeSettings, OlsrEngine, ProtocolConfig, SlotId,
    Willingness, api, channel_transport, monotonic_clock,
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "manetd", version, about = "Proactive OLSR mesh routing daemon")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// This node's id; overrides the configuration file.
    #[arg(long)]
    node_id: Option<u32>,

    /// Willingness to relay, 0-7; overrides the configuration file.
    #[arg(long)]
    willingness: Option<u8>,

    /// Announced TDMA slot; overrides the configuration file.
    #[arg(long)]
    tdma_slot: Option<u32>,

    /// Status API bind address, e.g. 127.0.0.1:8282.
    #[arg(long)]
    api_bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("manetd=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DaemonConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => {
            let Some(node_id) = cli.node_id else {
                bail!("either --config or --node-id is required");
            };
            DaemonConfig {
                node: NodeSettings {
                    id: node_id,
                    willingness: Willingness::Default,
                    tdma_slot: None,
                },
                api: ApiSettings::default(),
                protocol: ProtocolConfig::default(),
            }
        }
    };
    if let Some(node_id) = cli.node_id {
        config.node.id = node_id;
    }
    if let Some(raw) = cli.willingness {
        config.node.willingness = Willingness::from_value(raw);
    }
    if let Some(slot) = cli.tdma_slot {
        config.node.tdma_slot = Some(slot);
    }
    if let Some(bind) = cli.api_bind {
        config.api.bind = Some(bind);
    }

    let node_id = NodeId::new(config.node.id);
    info!(
        node = %node_id,
        willingness = ?config.node.willingness,
        slot = ?config.node.tdma_slot,
        "starting"
    );

    let engine = OlsrEngine::new(
        node_id,
        config.node.willingness,
        config.node.tdma_slot.map(SlotId::new),
        config.protocol.clone(),
        monotonic_clock(),
    )?;
    let (transport, mut radio) = channel_transport(64);
    let (daemon, handle) = Daemon::new(engine, transport);

    if let Some(bind) = config.api.bind.clone() {
        let status = handle.status();
        tokio::spawn(async move {
            if let Err(error) = api::serve(&bind, status).await {
                warn!(%error, "status api stopped");
            }
        });
    }

    // Standalone mode: play a radio that logs and drops outbound traffic.
    tokio::spawn(async move {
        loop {
            tokio::select! {
                message = radio.outbound.recv() => match message {
                    Some(message) => info!(
                        kind = ?message.kind,
                        seq = %message.seq,
                        ttl = %message.ttl,
                        "outbound control message (no radio attached)"
                    ),
                    None => break,
                },
                event = radio.events.recv() => match event {
                    Some(event) => warn!(dest = %event.dest, "destination lost"),
                    None => break,
                },
            }
        }
    });

    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            shutdown.shutdown();
        }
    });

    daemon.run().await?;
    Ok(())
}
