/// Default time-to-live of a freshly created message, in seconds.
pub const DEFAULT_TTL: f64 = 3600.0;

/// Error codes carried by `Error` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Unknown,
    LoadClientAppException,
    ClientAppRaisedException,
    NodeUnavailable,
}

impl ErrorCode {
    pub fn as_i64(self) -> i64 {
        match self {
            ErrorCode::Unknown => 0,
            ErrorCode::LoadClientAppException => 1,
            ErrorCode::ClientAppRaisedException => 2,
            ErrorCode::NodeUnavailable => 3,
        }
    }

    pub fn from_i64(code: i64) -> Option<Self> {
        match code {
            0 => Some(ErrorCode::Unknown),
            1 => Some(ErrorCode::LoadClientAppException),
            2 => Some(ErrorCode::ClientAppRaisedException),
            3 => Some(ErrorCode::NodeUnavailable),
            _ => None,
        }
    }
}

impl From<ErrorCode> for i64 {
    fn from(code: ErrorCode) -> Self {
        code.as_i64()
    }
}
