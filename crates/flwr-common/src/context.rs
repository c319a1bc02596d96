use crate::record::{RecordSet, UserConfig};

/// State scoped to one run on one node.
///
/// The ClientApp receives the context mutably; whatever it leaves behind is
/// sent back to the SuperNode alongside the reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub node_id: u64,
    pub node_config: UserConfig,
    pub state: RecordSet,
    pub run_config: UserConfig,
}

impl Context {
    pub fn new(
        node_id: u64,
        node_config: UserConfig,
        state: RecordSet,
        run_config: UserConfig,
    ) -> Self {
        Self {
            node_id,
            node_config,
            state,
            run_config,
        }
    }
}
