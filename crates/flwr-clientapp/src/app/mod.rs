//! ClientApp callbacks and the loaders that resolve them.

pub mod client_app;
pub mod echo;
pub mod loader;

pub use client_app::{AppError, ClientApp};
pub use echo::EchoApp;
pub use loader::{AppRegistry, ClientAppLoader, LoadClientAppError};
