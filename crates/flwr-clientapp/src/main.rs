//! flwr-clientapp - runs a process-isolated Flower ClientApp.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use flwr_clientapp::app::{AppRegistry, EchoApp};
use flwr_clientapp::cli::Args;
use flwr_clientapp::observability::init_logging;
use flwr_clientapp::run_clientapp;
use flwr_clientapp::shutdown::{ShutdownState, spawn_ctrl_c_listener};
use tracing::{debug, info};

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.log_format);
    info!("Starting Flower ClientApp");
    debug!(
        supernode = %args.supernode,
        token = ?args.token,
        "Starting isolated `ClientApp` connected to SuperNode ClientAppIo"
    );

    let mut registry = AppRegistry::new();
    registry.register_any_version(EchoApp::FAB_ID, Arc::new(EchoApp));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let shutdown = ShutdownState::new();
    let report = runtime.block_on(async {
        spawn_ctrl_c_listener(shutdown.clone());
        run_clientapp(&args.supernode, args.token, Arc::new(registry), &shutdown).await
    });
    // An interrupted ClientApp may still be running on the blocking pool.
    runtime.shutdown_background();

    Ok(report.outcome.exit_code())
}
