//! Drives one ClientApp process through the ClientAppIo protocol.
//!
//! A process handles exactly one unit of work: it obtains a token (unless one
//! was handed over on the command line), pulls the inputs for it, runs the
//! ClientApp behind the executor's fault boundary and pushes the reply. The
//! session is closed on every exit path.

use std::process::ExitCode;

use tracing::{Instrument, Span, debug, error, info, warn};

use crate::clientappio::{ClientAppIo, Reply, TransportError, WorkUnit};
use crate::executor::CallbackExecutor;
use crate::shutdown::ShutdownState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Idle,
    TokenPending,
    TokenAcquired,
    InputFetched,
    Executed,
    Published,
    Closed,
    Aborted,
}

#[derive(Debug)]
pub enum ProcessOutcome {
    Completed { token: u64 },
    Interrupted,
    Failed(TransportError),
}

impl ProcessOutcome {
    pub fn exit_status(&self) -> u8 {
        match self {
            ProcessOutcome::Failed(_) => 1,
            ProcessOutcome::Completed { .. } | ProcessOutcome::Interrupted => 0,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

#[derive(Debug)]
pub struct ProcessReport {
    pub outcome: ProcessOutcome,
    pub final_state: ProcessState,
    /// Last state reached before the session was torn down.
    pub last_active_state: ProcessState,
    pub token: Option<u64>,
}

impl ProcessReport {
    /// Report for a process that failed before a session existed.
    pub fn failed_to_start(error: TransportError) -> Self {
        Self {
            outcome: ProcessOutcome::Failed(error),
            final_state: ProcessState::Aborted,
            last_active_state: ProcessState::Idle,
            token: None,
        }
    }
}

enum Abort {
    Interrupted,
    Transport(TransportError),
}

pub struct ClientAppProcess<T> {
    io: T,
    executor: CallbackExecutor,
    state: ProcessState,
    token: Option<u64>,
    span: Span,
}

impl<T: ClientAppIo> ClientAppProcess<T> {
    pub fn new(io: T, executor: CallbackExecutor) -> Self {
        Self {
            io,
            executor,
            state: ProcessState::Idle,
            token: None,
            span: tracing::info_span!("clientapp"),
        }
    }

    /// Replaces the span all process logs are recorded in.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Runs the protocol once. Never fails: transport errors and interruption
    /// are logged and reported in the returned [`ProcessReport`].
    pub async fn run(mut self, token: Option<u64>, shutdown: &ShutdownState) -> ProcessReport {
        let span = self.span.clone();
        async move {
            let result = tokio::select! {
                biased;
                _ = shutdown.wait() => Err(Abort::Interrupted),
                result = self.drive(token) => result.map_err(Abort::Transport),
            };
            let last_active_state = self.state;

            self.io.close().await;
            let outcome = match result {
                Ok(token) => {
                    self.transition(ProcessState::Closed);
                    ProcessOutcome::Completed { token }
                }
                Err(Abort::Interrupted) => {
                    info!("Closing connection");
                    self.transition(ProcessState::Aborted);
                    ProcessOutcome::Interrupted
                }
                Err(Abort::Transport(err)) => {
                    error!(state = ?last_active_state, "{err}");
                    self.transition(ProcessState::Aborted);
                    ProcessOutcome::Failed(err)
                }
            };

            ProcessReport {
                outcome,
                final_state: self.state,
                last_active_state,
                token: self.token,
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self, token: Option<u64>) -> Result<u64, TransportError> {
        let token = match token {
            Some(token) => token,
            None => self.acquire_token().await?,
        };
        self.token = Some(token);
        self.transition(ProcessState::TokenAcquired);

        let WorkUnit {
            message,
            context,
            run,
        } = self.io.pull_inputs(token).await?;
        debug!(
            token,
            run_id = run.run_id,
            fab_id = %run.fab_id,
            fab_version = %run.fab_version,
            "pulled ClientApp inputs"
        );
        self.transition(ProcessState::InputFetched);

        let (message, context) = self.executor.execute_blocking(run, message, context).await;
        self.transition(ProcessState::Executed);

        let status = self
            .io
            .push_outputs(token, Reply { message, context })
            .await?;
        if !status.is_success() {
            warn!(
                code = ?status.code,
                message = %status.message,
                "SuperNode did not accept ClientApp outputs"
            );
        }
        self.transition(ProcessState::Published);
        Ok(token)
    }

    async fn acquire_token(&mut self) -> Result<u64, TransportError> {
        loop {
            self.transition(ProcessState::TokenPending);
            if let Some(token) = self.io.get_token().await? {
                return Ok(token);
            }
        }
    }

    fn transition(&mut self, next: ProcessState) {
        debug!(from = ?self.state, to = ?next, "ClientApp process state");
        self.state = next;
    }
}
