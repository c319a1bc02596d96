//! Records carried in message content and context state.

use std::collections::BTreeMap;

/// A single configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Double(f64),
    Sint64(i64),
    Uint64(u64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Double(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Sint64(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

/// Node, run and override configuration.
pub type UserConfig = BTreeMap<String, Scalar>;

/// Serialized tensor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array {
    pub dtype: String,
    pub shape: Vec<i32>,
    pub stype: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricsValue {
    Double(f64),
    Sint64(i64),
    DoubleList(Vec<f64>),
    Sint64List(Vec<i64>),
}

pub type ParametersRecord = BTreeMap<String, Array>;
pub type MetricsRecord = BTreeMap<String, MetricsValue>;
pub type ConfigsRecord = BTreeMap<String, Scalar>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub parameters_records: BTreeMap<String, ParametersRecord>,
    pub metrics_records: BTreeMap<String, MetricsRecord>,
    pub configs_records: BTreeMap<String, ConfigsRecord>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }
}
