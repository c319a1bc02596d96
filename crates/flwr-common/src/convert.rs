//! Conversions between domain entities and their protobuf messages.

use std::collections::{BTreeMap, HashMap};

use flwr_proto::flwr::proto as pb;
use flwr_proto::flwr::proto::metrics_record_value::Value as PbMetricsValue;
use flwr_proto::flwr::proto::scalar::Scalar as PbScalar;

use crate::context::Context;
use crate::message::{Error, Message, Metadata};
use crate::record::{
    Array, ConfigsRecord, MetricsRecord, MetricsValue, ParametersRecord, RecordSet, Scalar,
    UserConfig,
};
use crate::run::Run;

/// Errors raised while decoding protobuf messages into domain entities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("`{field}` has no value set for key `{key}`")]
    EmptyOneof { field: &'static str, key: String },
}

pub fn message_from_proto(message: pb::Message) -> Result<Message, ConversionError> {
    let metadata = message
        .metadata
        .ok_or(ConversionError::MissingField("message.metadata"))?;
    Ok(Message {
        metadata: metadata_from_proto(metadata),
        content: message.content.map(recordset_from_proto).transpose()?,
        error: message.error.map(error_from_proto),
    })
}

pub fn message_to_proto(message: Message) -> pb::Message {
    pb::Message {
        metadata: Some(metadata_to_proto(message.metadata)),
        content: message.content.map(recordset_to_proto),
        error: message.error.map(error_to_proto),
    }
}

pub fn context_from_proto(context: pb::Context) -> Result<Context, ConversionError> {
    Ok(Context {
        node_id: context.node_id,
        node_config: user_config_from_proto(context.node_config, "context.node_config")?,
        state: context
            .state
            .map(recordset_from_proto)
            .transpose()?
            .unwrap_or_default(),
        run_config: user_config_from_proto(context.run_config, "context.run_config")?,
    })
}

pub fn context_to_proto(context: Context) -> pb::Context {
    pb::Context {
        node_id: context.node_id,
        node_config: user_config_to_proto(context.node_config),
        state: Some(recordset_to_proto(context.state)),
        run_config: user_config_to_proto(context.run_config),
    }
}

pub fn run_from_proto(run: pb::Run) -> Result<Run, ConversionError> {
    Ok(Run {
        run_id: run.run_id,
        fab_id: run.fab_id,
        fab_version: run.fab_version,
        fab_hash: run.fab_hash,
        override_config: user_config_from_proto(run.override_config, "run.override_config")?,
    })
}

pub fn run_to_proto(run: Run) -> pb::Run {
    pb::Run {
        run_id: run.run_id,
        fab_id: run.fab_id,
        fab_version: run.fab_version,
        override_config: user_config_to_proto(run.override_config),
        fab_hash: run.fab_hash,
    }
}

fn metadata_from_proto(metadata: pb::Metadata) -> Metadata {
    Metadata {
        run_id: metadata.run_id,
        message_id: metadata.message_id,
        src_node_id: metadata.src_node_id,
        dst_node_id: metadata.dst_node_id,
        reply_to_message: metadata.reply_to_message,
        group_id: metadata.group_id,
        ttl: metadata.ttl,
        message_type: metadata.message_type,
        created_at: metadata.created_at,
    }
}

fn metadata_to_proto(metadata: Metadata) -> pb::Metadata {
    pb::Metadata {
        run_id: metadata.run_id,
        message_id: metadata.message_id,
        src_node_id: metadata.src_node_id,
        dst_node_id: metadata.dst_node_id,
        reply_to_message: metadata.reply_to_message,
        group_id: metadata.group_id,
        ttl: metadata.ttl,
        message_type: metadata.message_type,
        created_at: metadata.created_at,
    }
}

fn error_from_proto(error: pb::Error) -> Error {
    Error {
        code: error.code,
        reason: if error.reason.is_empty() {
            None
        } else {
            Some(error.reason)
        },
    }
}

fn error_to_proto(error: Error) -> pb::Error {
    pb::Error {
        code: error.code,
        reason: error.reason.unwrap_or_default(),
    }
}

fn recordset_from_proto(recordset: pb::RecordSet) -> Result<RecordSet, ConversionError> {
    let parameters_records = recordset
        .parameters
        .into_iter()
        .map(|(name, record)| (name, parameters_from_proto(record)))
        .collect();
    let metrics_records = recordset
        .metrics
        .into_iter()
        .map(|(name, record)| Ok((name, metrics_from_proto(record)?)))
        .collect::<Result<_, ConversionError>>()?;
    let configs_records = recordset
        .configs
        .into_iter()
        .map(|(name, record)| {
            Ok((
                name,
                user_config_from_proto(record.data, "configs_record.data")?,
            ))
        })
        .collect::<Result<_, ConversionError>>()?;
    Ok(RecordSet {
        parameters_records,
        metrics_records,
        configs_records,
    })
}

fn recordset_to_proto(recordset: RecordSet) -> pb::RecordSet {
    pb::RecordSet {
        parameters: recordset
            .parameters_records
            .into_iter()
            .map(|(name, record)| (name, parameters_to_proto(record)))
            .collect(),
        metrics: recordset
            .metrics_records
            .into_iter()
            .map(|(name, record)| (name, metrics_to_proto(record)))
            .collect(),
        configs: recordset
            .configs_records
            .into_iter()
            .map(|(name, record)| (name, configs_to_proto(record)))
            .collect(),
    }
}

fn parameters_from_proto(record: pb::ParametersRecord) -> ParametersRecord {
    record
        .data
        .into_iter()
        .map(|(key, array)| {
            (
                key,
                Array {
                    dtype: array.dtype,
                    shape: array.shape,
                    stype: array.stype,
                    data: array.data,
                },
            )
        })
        .collect()
}

fn parameters_to_proto(record: ParametersRecord) -> pb::ParametersRecord {
    pb::ParametersRecord {
        data: record
            .into_iter()
            .map(|(key, array)| {
                (
                    key,
                    pb::Array {
                        dtype: array.dtype,
                        shape: array.shape,
                        stype: array.stype,
                        data: array.data,
                    },
                )
            })
            .collect(),
    }
}

fn metrics_from_proto(record: pb::MetricsRecord) -> Result<MetricsRecord, ConversionError> {
    record
        .data
        .into_iter()
        .map(|(key, value)| {
            let value = match value.value {
                Some(PbMetricsValue::Double(v)) => MetricsValue::Double(v),
                Some(PbMetricsValue::Sint64(v)) => MetricsValue::Sint64(v),
                Some(PbMetricsValue::DoubleList(list)) => MetricsValue::DoubleList(list.vals),
                Some(PbMetricsValue::Sint64List(list)) => MetricsValue::Sint64List(list.vals),
                None => {
                    return Err(ConversionError::EmptyOneof {
                        field: "metrics_record.data",
                        key,
                    });
                }
            };
            Ok((key, value))
        })
        .collect()
}

fn metrics_to_proto(record: MetricsRecord) -> pb::MetricsRecord {
    pb::MetricsRecord {
        data: record
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    MetricsValue::Double(v) => PbMetricsValue::Double(v),
                    MetricsValue::Sint64(v) => PbMetricsValue::Sint64(v),
                    MetricsValue::DoubleList(vals) => {
                        PbMetricsValue::DoubleList(pb::DoubleList { vals })
                    }
                    MetricsValue::Sint64List(vals) => {
                        PbMetricsValue::Sint64List(pb::Sint64List { vals })
                    }
                };
                (key, pb::MetricsRecordValue { value: Some(value) })
            })
            .collect(),
    }
}

fn configs_to_proto(record: ConfigsRecord) -> pb::ConfigsRecord {
    pb::ConfigsRecord {
        data: user_config_to_proto(record),
    }
}

fn user_config_from_proto(
    config: HashMap<String, pb::Scalar>,
    field: &'static str,
) -> Result<UserConfig, ConversionError> {
    config
        .into_iter()
        .map(|(key, scalar)| match scalar.scalar {
            Some(value) => Ok((key, scalar_from_proto(value))),
            None => Err(ConversionError::EmptyOneof { field, key }),
        })
        .collect::<Result<BTreeMap<_, _>, _>>()
}

fn user_config_to_proto(config: UserConfig) -> HashMap<String, pb::Scalar> {
    config
        .into_iter()
        .map(|(key, value)| {
            (
                key,
                pb::Scalar {
                    scalar: Some(scalar_to_proto(value)),
                },
            )
        })
        .collect()
}

fn scalar_from_proto(scalar: PbScalar) -> Scalar {
    match scalar {
        PbScalar::Double(v) => Scalar::Double(v),
        PbScalar::Sint64(v) => Scalar::Sint64(v),
        PbScalar::Uint64(v) => Scalar::Uint64(v),
        PbScalar::Bool(v) => Scalar::Bool(v),
        PbScalar::String(v) => Scalar::String(v),
        PbScalar::Bytes(v) => Scalar::Bytes(v),
    }
}

fn scalar_to_proto(scalar: Scalar) -> PbScalar {
    match scalar {
        Scalar::Double(v) => PbScalar::Double(v),
        Scalar::Sint64(v) => PbScalar::Sint64(v),
        Scalar::Uint64(v) => PbScalar::Uint64(v),
        Scalar::Bool(v) => PbScalar::Bool(v),
        Scalar::String(v) => PbScalar::String(v),
        Scalar::Bytes(v) => PbScalar::Bytes(v),
    }
}
