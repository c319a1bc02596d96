use flwr_common::{Context, Message, MetricsValue};

use crate::app::client_app::{AppError, ClientApp};

/// Built-in ClientApp answering every message with the content it received.
///
/// It counts its invocations in `state.metrics_records["echo"]["calls"]`, which
/// makes it handy for checking that context state survives the round trip
/// through a SuperNode.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoApp;

impl EchoApp {
    pub const FAB_ID: &'static str = "flwrlabs/echo";
}

impl ClientApp for EchoApp {
    fn call(&self, message: Message, context: &mut Context) -> Result<Message, AppError> {
        let Some(content) = message.content.clone() else {
            return Err(AppError::new("ValueError", "message has no content to echo"));
        };
        let record = context
            .state
            .metrics_records
            .entry("echo".to_string())
            .or_default();
        let calls = match record.get("calls") {
            Some(MetricsValue::Sint64(calls)) => calls + 1,
            _ => 1,
        };
        record.insert("calls".to_string(), MetricsValue::Sint64(calls));
        Ok(message.create_reply(content))
    }
}
