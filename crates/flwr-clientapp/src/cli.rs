use clap::Parser;

use crate::observability::LogFormat;

#[derive(Parser, Debug, Clone)]
#[command(name = "flwr-clientapp", version, about = "Run a Flower ClientApp")]
pub struct Args {
    /// Address of SuperNode ClientAppIo gRPC servicer (e.g. 127.0.0.1:9094).
    #[arg(long, env = "FLWR_SUPERNODE")]
    pub supernode: String,
    /// Unique token generated by SuperNode for each ClientApp execution.
    #[arg(long, env = "FLWR_CLIENTAPP_TOKEN")]
    pub token: Option<u64>,
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}
