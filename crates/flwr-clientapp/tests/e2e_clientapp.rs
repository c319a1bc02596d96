use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use flwr_clientapp::app::{AppError, AppRegistry, EchoApp};
use flwr_clientapp::executor::LOAD_CLIENT_APP_REASON;
use flwr_clientapp::process::{ProcessOutcome, ProcessState};
use flwr_clientapp::run_clientapp;
use flwr_clientapp::shutdown::ShutdownState;
use flwr_common::convert::{
    context_from_proto, context_to_proto, message_from_proto, message_to_proto, run_to_proto,
};
use flwr_common::{
    Context, ErrorCode, Message, Metadata, MetricsValue, RecordSet, Run, Scalar, UserConfig,
};
use flwr_proto::flwr::proto::client_app_io_server::{ClientAppIo, ClientAppIoServer};
use flwr_proto::flwr::proto::{
    ClientAppOutputCode, ClientAppOutputStatus, GetTokenRequest, GetTokenResponse,
    PullClientAppInputsRequest, PullClientAppInputsResponse, PushClientAppOutputsRequest,
    PushClientAppOutputsResponse,
};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};

#[derive(Default)]
struct SuperNodeState {
    tokens: VecDeque<Option<u64>>,
    issued_token: u64,
    get_token_calls: usize,
    pulled: Vec<u64>,
    pushed: Vec<PushClientAppOutputsRequest>,
    fail_push: bool,
}

#[derive(Clone)]
struct FakeSuperNode {
    state: Arc<Mutex<SuperNodeState>>,
    inputs: PullClientAppInputsResponse,
}

#[tonic::async_trait]
impl ClientAppIo for FakeSuperNode {
    async fn get_token(
        &self,
        _request: Request<GetTokenRequest>,
    ) -> Result<Response<GetTokenResponse>, Status> {
        let mut state = self.state.lock().expect("state");
        state.get_token_calls += 1;
        let token = state.tokens.pop_front().flatten();
        if let Some(token) = token {
            state.issued_token = token;
        }
        Ok(Response::new(GetTokenResponse { token }))
    }

    async fn pull_client_app_inputs(
        &self,
        request: Request<PullClientAppInputsRequest>,
    ) -> Result<Response<PullClientAppInputsResponse>, Status> {
        let token = request.into_inner().token;
        let mut state = self.state.lock().expect("state");
        state.pulled.push(token);
        if token != state.issued_token {
            return Err(Status::permission_denied("invalid token"));
        }
        Ok(Response::new(self.inputs.clone()))
    }

    async fn push_client_app_outputs(
        &self,
        request: Request<PushClientAppOutputsRequest>,
    ) -> Result<Response<PushClientAppOutputsResponse>, Status> {
        let mut state = self.state.lock().expect("state");
        state.pushed.push(request.into_inner());
        if state.fail_push {
            return Err(Status::internal("outputs store unavailable"));
        }
        Ok(Response::new(PushClientAppOutputsResponse {
            status: Some(ClientAppOutputStatus {
                code: ClientAppOutputCode::Success as i32,
                message: "Success".to_string(),
            }),
        }))
    }
}

async fn start_supernode(
    supernode: FakeSuperNode,
) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let incoming = TcpListenerStream::new(listener);
    let handle = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(ClientAppIoServer::new(supernode))
            .serve_with_incoming(incoming)
            .await
            .expect("serve supernode");
    });
    (addr, handle)
}

fn inputs(fab_id: &str) -> (Message, Context, PullClientAppInputsResponse) {
    let mut content = RecordSet::new();
    content
        .configs_records
        .entry("config".to_string())
        .or_default()
        .insert("server-round".to_string(), Scalar::Sint64(2));
    let message = Message {
        metadata: Metadata {
            run_id: 77,
            message_id: "message-1".to_string(),
            src_node_id: 0,
            dst_node_id: 1001,
            group_id: "2".to_string(),
            ttl: 3600.0,
            message_type: "query".to_string(),
            ..Metadata::default()
        },
        content: Some(content),
        error: None,
    };
    let mut node_config = UserConfig::new();
    node_config.insert("partition-id".to_string(), Scalar::Sint64(0));
    let context = Context::new(1001, node_config, RecordSet::new(), UserConfig::new());
    let run = Run {
        run_id: 77,
        fab_id: fab_id.to_string(),
        fab_version: "1.0.0".to_string(),
        ..Run::default()
    };
    let response = PullClientAppInputsResponse {
        message: Some(message_to_proto(message.clone())),
        context: Some(context_to_proto(context.clone())),
        run: Some(run_to_proto(run)),
    };
    (message, context, response)
}

fn echo_registry() -> Arc<AppRegistry> {
    let mut registry = AppRegistry::new();
    registry.register_any_version(EchoApp::FAB_ID, Arc::new(EchoApp));
    registry.register_fn(
        "flwrlabs/divide",
        "1.0.0",
        |_message: Message, _context: &mut Context| -> Result<Message, AppError> {
            Err(AppError::new("ZeroDivisionError", "division by zero"))
        },
    );
    Arc::new(registry)
}

#[tokio::test]
async fn pre_supplied_token_round_trip_through_grpc() {
    let (message, context, response) = inputs(EchoApp::FAB_ID);
    let state = Arc::new(Mutex::new(SuperNodeState {
        issued_token: 7,
        ..SuperNodeState::default()
    }));
    let (addr, handle) = start_supernode(FakeSuperNode {
        state: state.clone(),
        inputs: response,
    })
    .await;
    let shutdown = ShutdownState::new();

    let report = run_clientapp(&addr.to_string(), Some(7), echo_registry(), &shutdown).await;

    assert!(matches!(report.outcome, ProcessOutcome::Completed { token: 7 }));
    assert_eq!(report.final_state, ProcessState::Closed);
    let state = state.lock().expect("state");
    assert_eq!(state.get_token_calls, 0);
    assert_eq!(state.pulled, vec![7]);
    assert_eq!(state.pushed.len(), 1);

    let pushed = state.pushed[0].clone();
    assert_eq!(pushed.token, 7);
    let reply = message_from_proto(pushed.message.expect("message")).expect("decode reply");
    assert_eq!(reply.content, message.content);
    assert_eq!(reply.metadata.reply_to_message, "message-1");
    assert_eq!(reply.metadata.dst_node_id, 0);
    assert_eq!(reply.metadata.src_node_id, 1001);
    let pushed_context =
        context_from_proto(pushed.context.expect("context")).expect("decode context");
    assert_eq!(pushed_context.node_config, context.node_config);
    assert_eq!(
        pushed_context.state.metrics_records["echo"].get("calls"),
        Some(&MetricsValue::Sint64(1))
    );

    handle.abort();
}

#[tokio::test]
async fn polls_for_token_before_pulling_inputs() {
    let (_, _, response) = inputs(EchoApp::FAB_ID);
    let state = Arc::new(Mutex::new(SuperNodeState {
        tokens: VecDeque::from([None, None, Some(42)]),
        ..SuperNodeState::default()
    }));
    let (addr, handle) = start_supernode(FakeSuperNode {
        state: state.clone(),
        inputs: response,
    })
    .await;
    let shutdown = ShutdownState::new();

    let report = run_clientapp(&addr.to_string(), None, echo_registry(), &shutdown).await;

    assert!(matches!(report.outcome, ProcessOutcome::Completed { token: 42 }));
    let state = state.lock().expect("state");
    assert_eq!(state.get_token_calls, 3);
    assert_eq!(state.pulled, vec![42]);
    assert_eq!(state.pushed.len(), 1);
    assert_eq!(state.pushed[0].token, 42);

    handle.abort();
}

#[tokio::test]
async fn unknown_app_pushes_load_error_with_unchanged_context() {
    let (_, context, response) = inputs("flwrlabs/not-installed");
    let state = Arc::new(Mutex::new(SuperNodeState {
        issued_token: 3,
        ..SuperNodeState::default()
    }));
    let (addr, handle) = start_supernode(FakeSuperNode {
        state: state.clone(),
        inputs: response,
    })
    .await;
    let shutdown = ShutdownState::new();

    let report = run_clientapp(&addr.to_string(), Some(3), echo_registry(), &shutdown).await;

    assert_eq!(report.outcome.exit_status(), 0);
    let state = state.lock().expect("state");
    let pushed = state.pushed[0].clone();
    let reply = message_from_proto(pushed.message.expect("message")).expect("decode reply");
    let error = reply.error.expect("error reply");
    assert_eq!(error.error_code(), Some(ErrorCode::LoadClientAppException));
    assert_eq!(error.reason.as_deref(), Some(LOAD_CLIENT_APP_REASON));
    assert!(reply.content.is_none());
    let pushed_context =
        context_from_proto(pushed.context.expect("context")).expect("decode context");
    assert_eq!(pushed_context, context);

    handle.abort();
}

#[tokio::test]
async fn raising_app_pushes_golden_reason() {
    let (_, _, response) = inputs("flwrlabs/divide");
    let state = Arc::new(Mutex::new(SuperNodeState {
        issued_token: 4,
        ..SuperNodeState::default()
    }));
    let (addr, handle) = start_supernode(FakeSuperNode {
        state: state.clone(),
        inputs: response,
    })
    .await;
    let shutdown = ShutdownState::new();

    run_clientapp(&addr.to_string(), Some(4), echo_registry(), &shutdown).await;

    let state = state.lock().expect("state");
    let pushed = state.pushed[0].clone();
    let error = pushed.message.and_then(|m| m.error).expect("error reply");
    assert_eq!(error.code, ErrorCode::ClientAppRaisedException.as_i64());
    assert_eq!(
        error.reason,
        "<class 'ZeroDivisionError'>:<'division by zero'>"
    );

    handle.abort();
}

#[tokio::test]
async fn push_failure_is_fatal_but_not_raised() {
    let (_, _, response) = inputs(EchoApp::FAB_ID);
    let state = Arc::new(Mutex::new(SuperNodeState {
        issued_token: 9,
        fail_push: true,
        ..SuperNodeState::default()
    }));
    let (addr, handle) = start_supernode(FakeSuperNode {
        state: state.clone(),
        inputs: response,
    })
    .await;
    let shutdown = ShutdownState::new();

    let report = run_clientapp(&addr.to_string(), Some(9), echo_registry(), &shutdown).await;

    assert!(matches!(report.outcome, ProcessOutcome::Failed(_)));
    assert_eq!(report.outcome.exit_status(), 1);
    assert_eq!(report.final_state, ProcessState::Aborted);
    assert_eq!(report.last_active_state, ProcessState::Executed);
    assert_eq!(state.lock().expect("state").pushed.len(), 1);

    handle.abort();
}

#[tokio::test]
async fn rejected_token_aborts_before_execution() {
    let (_, _, response) = inputs(EchoApp::FAB_ID);
    let state = Arc::new(Mutex::new(SuperNodeState {
        issued_token: 1,
        ..SuperNodeState::default()
    }));
    let (addr, handle) = start_supernode(FakeSuperNode {
        state: state.clone(),
        inputs: response,
    })
    .await;
    let shutdown = ShutdownState::new();

    let report = run_clientapp(&addr.to_string(), Some(2), echo_registry(), &shutdown).await;

    assert!(matches!(report.outcome, ProcessOutcome::Failed(_)));
    assert_eq!(report.last_active_state, ProcessState::TokenAcquired);
    let state = state.lock().expect("state");
    assert_eq!(state.pulled, vec![2]);
    assert!(state.pushed.is_empty());

    handle.abort();
}
