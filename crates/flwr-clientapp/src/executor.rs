//! Fault boundary around ClientApp resolution and invocation.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use flwr_common::{Context, Error, ErrorCode, Message, Run};
use tracing::error;

use crate::app::{AppError, ClientAppLoader, LoadClientAppError};

/// Reason sent when the ClientApp cannot be loaded. Loader details stay local.
pub const LOAD_CLIENT_APP_REASON: &str =
    "An exception was raised when attempting to load `ClientApp`";

/// Why the ClientApp did not produce a reply.
#[derive(Debug, thiserror::Error)]
pub enum ClientAppFailure {
    #[error("failed to load ClientApp: {0}")]
    Load(#[source] LoadClientAppError),
    #[error("ClientApp raised an exception: {0}")]
    Execution(#[source] AppError),
}

impl ClientAppFailure {
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientAppFailure::Load(_) => ErrorCode::LoadClientAppException,
            ClientAppFailure::Execution(_) => ErrorCode::ClientAppRaisedException,
        }
    }

    /// The error attached to the reply message.
    pub fn to_error(&self) -> Error {
        match self {
            ClientAppFailure::Load(_) => Error::new(self.code(), LOAD_CLIENT_APP_REASON),
            ClientAppFailure::Execution(app_error) => Error::new(self.code(), app_error.reason()),
        }
    }
}

#[derive(Clone)]
pub struct CallbackExecutor {
    loader: Arc<dyn ClientAppLoader>,
}

impl CallbackExecutor {
    pub fn new(loader: Arc<dyn ClientAppLoader>) -> Self {
        Self { loader }
    }

    /// Loads the ClientApp named by `run` and hands it the message.
    ///
    /// Panics raised by the loader or the app are caught and reported as
    /// failures of the respective step.
    pub fn run(
        &self,
        run: &Run,
        message: Message,
        context: &mut Context,
    ) -> Result<Message, ClientAppFailure> {
        let app = catch_unwind(AssertUnwindSafe(|| {
            self.loader.load(&run.fab_id, &run.fab_version)
        }))
        .map_err(|payload| {
            ClientAppFailure::Load(LoadClientAppError::Panicked(panic_message(payload.as_ref())))
        })?
        .map_err(ClientAppFailure::Load)?;

        catch_unwind(AssertUnwindSafe(|| app.call(message, context)))
            .map_err(|payload| {
                ClientAppFailure::Execution(AppError::panic(panic_message(payload.as_ref())))
            })?
            .map_err(ClientAppFailure::Execution)
    }

    /// Runs the ClientApp and always returns a message to push back.
    ///
    /// Failures turn into an error reply to `message`. `context` keeps
    /// whatever state the app left in it.
    pub fn execute(&self, run: &Run, message: Message, context: &mut Context) -> Message {
        let request = header_only(&message);
        match self.run(run, message, context) {
            Ok(reply) => reply,
            Err(failure) => {
                error!(
                    fab_id = %run.fab_id,
                    fab_version = %run.fab_version,
                    error = %failure,
                    "ClientApp raised an exception"
                );
                request.create_error_reply(failure.to_error())
            }
        }
    }

    /// Like [`execute`](Self::execute), but on the blocking thread pool so a
    /// long-running app does not stall the async runtime.
    pub async fn execute_blocking(
        &self,
        run: Run,
        message: Message,
        context: Context,
    ) -> (Message, Context) {
        let request = header_only(&message);
        let snapshot = context.clone();
        let executor = self.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut context = context;
            let reply = executor.execute(&run, message, &mut context);
            (reply, context)
        });
        match task.await {
            Ok(output) => output,
            // A panic escaped the boundary, e.g. while dropping a panic payload.
            Err(join_error) => {
                error!(error = %join_error, "ClientApp task did not complete");
                let failure =
                    ClientAppFailure::Execution(AppError::new("JoinError", join_error.to_string()));
                (request.create_error_reply(failure.to_error()), snapshot)
            }
        }
    }
}

fn header_only(message: &Message) -> Message {
    Message {
        metadata: message.metadata.clone(),
        content: None,
        error: None,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
