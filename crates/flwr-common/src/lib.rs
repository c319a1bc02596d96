//! Flower common domain types.
//!
//! This crate provides the entities exchanged between a SuperNode and a
//! process-isolated ClientApp (`Message`, `Context`, `Run` and the records they
//! carry), together with their protobuf conversions.

pub mod constant;
pub mod context;
pub mod convert;
pub mod message;
pub mod record;
pub mod run;

pub use constant::{DEFAULT_TTL, ErrorCode};
pub use context::Context;
pub use convert::ConversionError;
pub use message::{Error, Message, Metadata};
pub use record::{
    Array, ConfigsRecord, MetricsRecord, MetricsValue, ParametersRecord, RecordSet, Scalar,
    UserConfig,
};
pub use run::Run;
