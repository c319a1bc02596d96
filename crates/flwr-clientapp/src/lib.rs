//! Flower ClientApp process.
//!
//! This crate runs a ClientApp isolated from its SuperNode:
//! - ClientAppIo session over gRPC (`clientappio`)
//! - ClientApp callbacks and loaders (`app`)
//! - Fault boundary turning app failures into error replies (`executor`)
//! - Token → inputs → execution → outputs driver (`process`)

pub mod app;
pub mod cli;
pub mod clientappio;
pub mod executor;
pub mod observability;
pub mod process;
pub mod shutdown;

use std::sync::Arc;

use tracing::error;

use crate::app::ClientAppLoader;
use crate::clientappio::GrpcSession;
use crate::executor::CallbackExecutor;
use crate::process::{ClientAppProcess, ProcessReport};
use crate::shutdown::ShutdownState;

/// Runs one process-isolated ClientApp against the SuperNode at `supernode`.
///
/// Without a `token` the SuperNode is polled until it issues one.
pub async fn run_clientapp(
    supernode: &str,
    token: Option<u64>,
    loader: Arc<dyn ClientAppLoader>,
    shutdown: &ShutdownState,
) -> ProcessReport {
    let span = observability::clientapp_span(supernode);
    let session = match GrpcSession::connect_lazy(supernode) {
        Ok(session) => session,
        Err(err) => {
            error!(parent: &span, "{err}");
            return ProcessReport::failed_to_start(err);
        }
    };
    ClientAppProcess::new(session, CallbackExecutor::new(loader))
        .with_span(span)
        .run(token, shutdown)
        .await
}
