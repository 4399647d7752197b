//! Warden host supervisor daemon.
//!
//! Boot order mirrors the host firmware contract: the reboot watcher comes
//! up first so a stuck boot can still be recovered remotely, then the
//! privileged domain, then the workload domain. Container instances are
//! started later by the external launcher through the runtime adapter.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use warden_core::{EventEmitter, HostConfig, Result, WardenError};
use warden_runtime::{
    boot_domains, FsStore, HostPower, NullPower, RebootSupervisor, StubDomainControl,
};

mod domains;

/// Warden host supervisor
#[derive(Parser, Debug)]
#[command(name = "warden-hostd")]
#[command(about = "Boots and supervises isolated workload environments")]
struct Args {
    /// Path to the host configuration file (JSON); defaults apply if absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log reset requests instead of resetting the host
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Host supervisor failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    tracing::info!(version = warden_core::VERSION, "Starting warden host supervisor");

    let events = EventEmitter::new(256);
    spawn_event_logger(&events);

    // Reboot watcher first: it must survive a failed domain boot.
    let store = Arc::new(FsStore::new(config.reboot.store_root.clone()));
    let power: Arc<dyn HostPower> = if args.dry_run {
        Arc::new(NullPower)
    } else {
        reset_adapter()
    };
    let mut reboot = RebootSupervisor::new(&config.reboot, store, power, events.clone());
    reboot.start();

    // Bring the domains up: privileged first, then the workload domain.
    // The hypervisor bindings are external; this build drives the stub.
    let control = StubDomainControl::new();
    let mut specs = Vec::new();

    let privileged = &config.privileged_domain;
    specs.push(domains::privileged_spec(
        privileged,
        domains::load_image(privileged)?,
        domains::load_dtb(privileged)?,
    ));

    if let Some(workload) = &config.workload_domain {
        specs.push(domains::workload_spec(
            workload,
            domains::load_image(workload)?,
            domains::load_dtb(workload)?,
        ));
    }

    let started = boot_domains(specs, &control, &events).await?;
    for (name, domain_id) in &started {
        tracing::info!(domain = %name, domain_id, "Domain up");
    }

    tracing::info!("Boot complete, supervising");
    tokio::signal::ctrl_c()
        .await
        .map_err(WardenError::Io)?;

    tracing::info!("Shutting down");
    reboot.stop().await;

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<HostConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)
                .map_err(|e| WardenError::Config(format!("{}: {e}", path.display())))
        }
        None => Ok(HostConfig::default()),
    }
}

#[cfg(target_os = "linux")]
fn reset_adapter() -> Arc<dyn HostPower> {
    Arc::new(warden_runtime::LinuxPower)
}

#[cfg(not(target_os = "linux"))]
fn reset_adapter() -> Arc<dyn HostPower> {
    Arc::new(NullPower)
}

/// Log every host event; operators follow boot progress through these.
fn spawn_event_logger(events: &EventEmitter) {
    use tokio::sync::broadcast::error::RecvError;

    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    tracing::info!(key = %event.key, payload = ?event.payload, "host event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
