//! The ClientAppIo protocol as seen from the ClientApp process.

pub mod grpc;

use async_trait::async_trait;
use flwr_common::convert::{context_from_proto, message_from_proto, run_from_proto};
use flwr_common::{ConversionError, Context, Message, Run};
use flwr_proto::flwr::proto::{
    ClientAppOutputCode as PbClientAppOutputCode, ClientAppOutputStatus as PbClientAppOutputStatus,
    PullClientAppInputsResponse,
};

pub use grpc::{ConnectivityState, GRPC_MAX_MESSAGE_LENGTH, GrpcSession};

/// The unit of work pulled for a token.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkUnit {
    pub message: Message,
    pub context: Context,
    pub run: Run,
}

impl WorkUnit {
    /// Decodes and validates a `PullClientAppInputs` response.
    pub fn from_proto(response: PullClientAppInputsResponse) -> Result<Self, TransportError> {
        let message = response
            .message
            .ok_or_else(|| TransportError::Protocol("inputs response without message".into()))?;
        let context = response
            .context
            .ok_or_else(|| TransportError::Protocol("inputs response without context".into()))?;
        let run = response
            .run
            .ok_or_else(|| TransportError::Protocol("inputs response without run".into()))?;

        let message = message_from_proto(message).map_err(|source| TransportError::Decode {
            what: "message",
            source,
        })?;
        let context = context_from_proto(context).map_err(|source| TransportError::Decode {
            what: "context",
            source,
        })?;
        let run = run_from_proto(run).map_err(|source| TransportError::Decode {
            what: "run",
            source,
        })?;

        if message.metadata.run_id != run.run_id {
            return Err(TransportError::Protocol(format!(
                "message belongs to run {} but run metadata is for run {}",
                message.metadata.run_id, run.run_id
            )));
        }
        Ok(Self {
            message,
            context,
            run,
        })
    }
}

/// The reply pushed back for a token.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub message: Message,
    pub context: Context,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAppOutputCode {
    Success,
    DeadlineExceeded,
    UnknownError,
}

/// SuperNode acknowledgement of pushed outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAppOutputStatus {
    pub code: ClientAppOutputCode,
    pub message: String,
}

impl ClientAppOutputStatus {
    pub fn success() -> Self {
        Self {
            code: ClientAppOutputCode::Success,
            message: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ClientAppOutputCode::Success
    }

    pub(crate) fn from_proto(status: Option<PbClientAppOutputStatus>) -> Self {
        let Some(status) = status else {
            return Self::success();
        };
        let code = match PbClientAppOutputCode::try_from(status.code) {
            Ok(PbClientAppOutputCode::Success) => ClientAppOutputCode::Success,
            Ok(PbClientAppOutputCode::DeadlineExceeded) => ClientAppOutputCode::DeadlineExceeded,
            Ok(PbClientAppOutputCode::UnknownError) | Err(_) => ClientAppOutputCode::UnknownError,
        };
        Self {
            code,
            message: status.message,
        }
    }
}

/// Failures talking to the SuperNode. All of them end the process.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid SuperNode address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("gRPC error occurred: {0}")]
    Rpc(#[from] tonic::Status),
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: ConversionError,
    },
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("ClientAppIo session is closed")]
    Closed,
}

/// Remote calls a ClientApp process makes against its SuperNode.
#[async_trait]
pub trait ClientAppIo: Send {
    /// Returns `None` while the SuperNode has no token to hand out.
    async fn get_token(&mut self) -> Result<Option<u64>, TransportError>;

    async fn pull_inputs(&mut self, token: u64) -> Result<WorkUnit, TransportError>;

    async fn push_outputs(
        &mut self,
        token: u64,
        reply: Reply,
    ) -> Result<ClientAppOutputStatus, TransportError>;

    /// Releases the session. Calling it again is a no-op.
    async fn close(&mut self);
}
