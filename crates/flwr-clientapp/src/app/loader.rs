use std::collections::HashMap;
use std::sync::Arc;

use flwr_common::{Context, Message};

use crate::app::client_app::{AppError, ClientApp};

/// Resolves the ClientApp of a FAB (`fab_id` + `fab_version`).
pub trait ClientAppLoader: Send + Sync {
    fn load(&self, fab_id: &str, fab_version: &str)
    -> Result<Arc<dyn ClientApp>, LoadClientAppError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LoadClientAppError {
    #[error("invalid FAB id `{0}`, expected `<publisher>/<name>`")]
    InvalidFabId(String),
    #[error("no ClientApp registered for `{fab_id}` version `{fab_version}`")]
    NotFound { fab_id: String, fab_version: String },
    #[error("failed to read ClientApp bundle: {0}")]
    Io(#[from] std::io::Error),
    #[error("loader panicked: {0}")]
    Panicked(String),
}

/// In-process registry of compiled-in ClientApps.
///
/// Lookups try the exact `(fab_id, fab_version)` pair first and then a
/// registration made for every version of `fab_id`.
#[derive(Default, Clone)]
pub struct AppRegistry {
    versioned: HashMap<(String, String), Arc<dyn ClientApp>>,
    any_version: HashMap<String, Arc<dyn ClientApp>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        fab_id: impl Into<String>,
        fab_version: impl Into<String>,
        app: Arc<dyn ClientApp>,
    ) -> &mut Self {
        self.versioned
            .insert((fab_id.into(), fab_version.into()), app);
        self
    }

    pub fn register_any_version(
        &mut self,
        fab_id: impl Into<String>,
        app: Arc<dyn ClientApp>,
    ) -> &mut Self {
        self.any_version.insert(fab_id.into(), app);
        self
    }

    pub fn register_fn<F>(
        &mut self,
        fab_id: impl Into<String>,
        fab_version: impl Into<String>,
        app: F,
    ) -> &mut Self
    where
        F: Fn(Message, &mut Context) -> Result<Message, AppError> + Send + Sync + 'static,
    {
        self.register(fab_id, fab_version, Arc::new(app))
    }

    pub fn len(&self) -> usize {
        self.versioned.len() + self.any_version.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClientAppLoader for AppRegistry {
    fn load(
        &self,
        fab_id: &str,
        fab_version: &str,
    ) -> Result<Arc<dyn ClientApp>, LoadClientAppError> {
        validate_fab_id(fab_id)?;
        let key = (fab_id.to_string(), fab_version.to_string());
        self.versioned
            .get(&key)
            .or_else(|| self.any_version.get(fab_id))
            .cloned()
            .ok_or_else(|| LoadClientAppError::NotFound {
                fab_id: fab_id.to_string(),
                fab_version: fab_version.to_string(),
            })
    }
}

fn validate_fab_id(fab_id: &str) -> Result<(), LoadClientAppError> {
    match fab_id.split_once('/') {
        Some((publisher, name))
            if !publisher.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok(())
        }
        _ => Err(LoadClientAppError::InvalidFabId(fab_id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flwr_common::{Metadata, Scalar};

    fn tagging_app(tag: &'static str) -> Arc<dyn ClientApp> {
        Arc::new(
            move |message: Message, context: &mut Context| -> Result<Message, AppError> {
                context
                    .run_config
                    .insert("loaded".to_string(), tag.into());
                Ok(message)
            },
        )
    }

    fn call(app: &Arc<dyn ClientApp>) -> Context {
        let mut context = Context::default();
        let message = Message {
            metadata: Metadata::default(),
            content: None,
            error: None,
        };
        app.call(message, &mut context).expect("call");
        context
    }

    #[test]
    fn exact_version_wins_over_any_version() {
        let mut registry = AppRegistry::new();
        registry
            .register_any_version("flwrlabs/demo", tagging_app("any"))
            .register("flwrlabs/demo", "1.2.0", tagging_app("exact"));

        let exact = registry.load("flwrlabs/demo", "1.2.0").expect("exact");
        assert_eq!(
            call(&exact).run_config.get("loaded"),
            Some(&Scalar::from("exact"))
        );

        let fallback = registry.load("flwrlabs/demo", "0.9.0").expect("fallback");
        assert_eq!(
            call(&fallback).run_config.get("loaded"),
            Some(&Scalar::from("any"))
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unknown_fab_is_not_found() {
        let registry = AppRegistry::new();
        let result = registry.load("flwrlabs/missing", "1.0.0");
        assert!(matches!(
            result,
            Err(LoadClientAppError::NotFound { ref fab_id, ref fab_version })
                if fab_id == "flwrlabs/missing" && fab_version == "1.0.0"
        ));
    }

    #[test]
    fn malformed_fab_id_is_rejected() {
        let mut registry = AppRegistry::new();
        registry.register_any_version("demo", tagging_app("any"));
        for fab_id in ["demo", "", "/demo", "flwrlabs/", "a/b/c"] {
            assert!(
                matches!(
                    registry.load(fab_id, "1.0.0"),
                    Err(LoadClientAppError::InvalidFabId(_))
                ),
                "{fab_id} should be rejected"
            );
        }
    }
}
