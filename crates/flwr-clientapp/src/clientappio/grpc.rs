use async_trait::async_trait;
use flwr_common::convert::{context_to_proto, message_to_proto};
use flwr_proto::flwr::proto::client_app_io_client::ClientAppIoClient;
use flwr_proto::flwr::proto::{
    GetTokenRequest, PullClientAppInputsRequest, PushClientAppOutputsRequest,
};
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};
use tracing::debug;

use super::{ClientAppIo, ClientAppOutputStatus, Reply, TransportError, WorkUnit};

/// Maximum encoded message size accepted or sent over ClientAppIo (512 MiB).
pub const GRPC_MAX_MESSAGE_LENGTH: usize = 536_870_912;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    /// Channel created, no call completed yet.
    Idle,
    Ready,
    TransientFailure,
    Shutdown,
}

/// Insecure gRPC session to a SuperNode's ClientAppIo servicer.
pub struct GrpcSession {
    client: Option<ClientAppIoClient<Channel>>,
    state: ConnectivityState,
}

impl GrpcSession {
    /// Creates the session without dialing; the connection is established by
    /// the first call.
    pub fn connect_lazy(address: &str) -> Result<Self, TransportError> {
        let uri = normalize_address(address);
        let endpoint =
            Endpoint::from_shared(uri.clone()).map_err(|err| TransportError::InvalidAddress {
                address: address.to_string(),
                reason: err.to_string(),
            })?;
        debug!(address = %uri, "ClientAppIo channel created");
        Ok(Self::from_channel(endpoint.connect_lazy()))
    }

    pub fn from_channel(channel: Channel) -> Self {
        let client = ClientAppIoClient::new(channel)
            .max_decoding_message_size(GRPC_MAX_MESSAGE_LENGTH)
            .max_encoding_message_size(GRPC_MAX_MESSAGE_LENGTH);
        Self {
            client: Some(client),
            state: ConnectivityState::Idle,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    fn client(&mut self) -> Result<&mut ClientAppIoClient<Channel>, TransportError> {
        self.client.as_mut().ok_or(TransportError::Closed)
    }

    fn observe<T>(&mut self, result: &Result<T, Status>) {
        let next = match result {
            Ok(_) => ConnectivityState::Ready,
            Err(status) if status.code() == Code::Unavailable => {
                ConnectivityState::TransientFailure
            }
            Err(_) => self.state,
        };
        self.set_state(next);
    }

    fn set_state(&mut self, next: ConnectivityState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "ClientAppIo channel connectivity changed");
            self.state = next;
        }
    }
}

#[async_trait]
impl ClientAppIo for GrpcSession {
    async fn get_token(&mut self) -> Result<Option<u64>, TransportError> {
        debug!("Flower ClientApp process requests token");
        let result = self
            .client()?
            .get_token(Request::new(GetTokenRequest {}))
            .await;
        self.observe(&result);
        Ok(result?.into_inner().token)
    }

    async fn pull_inputs(&mut self, token: u64) -> Result<WorkUnit, TransportError> {
        let result = self
            .client()?
            .pull_client_app_inputs(Request::new(PullClientAppInputsRequest { token }))
            .await;
        self.observe(&result);
        WorkUnit::from_proto(result?.into_inner())
    }

    async fn push_outputs(
        &mut self,
        token: u64,
        reply: Reply,
    ) -> Result<ClientAppOutputStatus, TransportError> {
        let request = PushClientAppOutputsRequest {
            token,
            message: Some(message_to_proto(reply.message)),
            context: Some(context_to_proto(reply.context)),
        };
        let result = self
            .client()?
            .push_client_app_outputs(Request::new(request))
            .await;
        self.observe(&result);
        Ok(ClientAppOutputStatus::from_proto(result?.into_inner().status))
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            self.set_state(ConnectivityState::Shutdown);
        }
    }
}

fn normalize_address(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}
