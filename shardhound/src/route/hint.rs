//! Caller-supplied sharding overrides.

use fnv::FnvHashMap;
use shardhound_config::ShardValue;

/// Sharding values supplied by the caller, bypassing condition
/// extraction. Owned by the session and threaded through the routing
/// call explicitly; never ambient state.
///
/// Hints outlive the statement that set them only if the caller lets
/// them: call [`HintContext::clear`] at the statement boundary, or the
/// next statement on the same session is silently rerouted.
#[derive(Debug, Clone, Default)]
pub struct HintContext {
    database: FnvHashMap<String, Vec<ShardValue>>,
    table: FnvHashMap<String, Vec<ShardValue>>,
}

impl HintContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_database_value(&mut self, logic_table: &str, value: impl Into<ShardValue>) {
        self.database
            .entry(logic_table.to_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn add_table_value(&mut self, logic_table: &str, value: impl Into<ShardValue>) {
        self.table
            .entry(logic_table.to_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn database_values(&self, logic_table: &str) -> &[ShardValue] {
        self.database
            .get(&logic_table.to_lowercase())
            .map(|values| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn table_values(&self, logic_table: &str) -> &[ShardValue] {
        self.table
            .get(&logic_table.to_lowercase())
            .map(|values| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.database.is_empty() && self.table.is_empty()
    }

    /// Drop all hint values. Call at the statement boundary.
    pub fn clear(&mut self) {
        self.database.clear();
        self.table.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hints_case_insensitive() {
        let mut hints = HintContext::new();
        hints.add_database_value("T_ORDER", 1i64);
        hints.add_table_value("t_order", "abc");

        assert_eq!(hints.database_values("t_order"), [ShardValue::Integer(1)]);
        assert_eq!(
            hints.table_values("T_Order"),
            [ShardValue::String("abc".into())]
        );
        assert!(!hints.is_empty());

        hints.clear();
        assert!(hints.is_empty());
        assert!(hints.database_values("t_order").is_empty());
    }
}
