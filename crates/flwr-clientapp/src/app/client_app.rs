use flwr_common::{Context, Message};

/// Application callback executed inside the ClientApp process.
///
/// Implementations receive the pulled message by value and the run context
/// mutably. Mutations to the context are sent back to the SuperNode whether
/// the call succeeds or fails.
pub trait ClientApp: Send + Sync {
    fn call(&self, message: Message, context: &mut Context) -> Result<Message, AppError>;
}

impl<F> ClientApp for F
where
    F: Fn(Message, &mut Context) -> Result<Message, AppError> + Send + Sync,
{
    fn call(&self, message: Message, context: &mut Context) -> Result<Message, AppError> {
        self(message, context)
    }
}

/// Failure raised by a ClientApp while handling a message.
///
/// `kind` names the failure the way a caller would recognise it (an exception
/// class, a Rust error type, or `panic`); `message` is its display text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    kind: String,
    message: String,
}

impl AppError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Wraps a Rust error, naming it after its type.
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        Self::new(short_type_name::<E>(), error.to_string())
    }

    pub(crate) fn panic(message: impl Into<String>) -> Self {
        Self::new("panic", message)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Reason string sent to the SuperNode, e.g.
    /// `<class 'ZeroDivisionError'>:<'division by zero'>`.
    pub fn reason(&self) -> String {
        format!("<class '{}'>:<'{}'>", self.kind, self.message)
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_matches_golden_format() {
        let error = AppError::new("ZeroDivisionError", "division by zero");
        assert_eq!(
            error.reason(),
            "<class 'ZeroDivisionError'>:<'division by zero'>"
        );
    }

    #[test]
    fn from_error_uses_short_type_name() {
        let parse_error = "abc".parse::<i32>().expect_err("not a number");
        let error = AppError::from_error(&parse_error);
        assert_eq!(error.kind(), "ParseIntError");
        assert_eq!(error.message(), "invalid digit found in string");
        assert_eq!(
            error.reason(),
            "<class 'ParseIntError'>:<'invalid digit found in string'>"
        );
    }

    #[test]
    fn closures_are_client_apps() {
        let app = |message: Message, context: &mut Context| -> Result<Message, AppError> {
            context.node_id += 1;
            Ok(message)
        };
        let mut context = Context::default();
        let message = Message {
            metadata: Default::default(),
            content: None,
            error: None,
        };
        let reply = ClientApp::call(&app, message.clone(), &mut context).expect("call");
        assert_eq!(reply, message);
        assert_eq!(context.node_id, 1);
    }
}
