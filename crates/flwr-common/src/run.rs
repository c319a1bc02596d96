use crate::record::UserConfig;

/// Run metadata identifying the application bundle (FAB) to execute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub run_id: u64,
    pub fab_id: String,
    pub fab_version: String,
    pub fab_hash: String,
    pub override_config: UserConfig,
}
