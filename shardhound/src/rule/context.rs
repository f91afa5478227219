use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use super::ShardingRule;

/// Holds the active rule for a schema. Statements load a snapshot
/// and keep it for their whole lifetime; administrative changes
/// replace the rule wholesale, never in place.
pub struct SchemaContext {
    rule: ArcSwap<ShardingRule>,
}

impl SchemaContext {
    pub fn new(rule: ShardingRule) -> Self {
        Self {
            rule: ArcSwap::from_pointee(rule),
        }
    }

    /// Snapshot of the active rule.
    pub fn rule(&self) -> Arc<ShardingRule> {
        self.rule.load_full()
    }

    /// Replace the rule. In-flight statements keep their snapshot.
    pub fn reload(&self, rule: ShardingRule) {
        self.rule.store(Arc::new(rule));
        info!("sharding rule reloaded");
    }
}
