//! Flower Protocol Buffer generated code.
//!
//! This crate contains the generated Rust code for the ClientAppIo gRPC protocol
//! spoken between a SuperNode and its process-isolated ClientApps.

pub mod flwr {
    pub mod proto {
        tonic::include_proto!("flwr.proto");
    }
}

// Re-export commonly used types at the crate root for convenience
pub use flwr::proto::*;
