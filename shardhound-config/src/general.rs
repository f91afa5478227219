use serde::{Deserialize, Serialize};

/// General settings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct General {
    /// Worker identity for generated keys. Must be unique
    /// per middleware instance writing to the same tables.
    #[serde(default)]
    pub worker_id: u32,

    /// Where statements over tables without a rule are sent.
    #[serde(default)]
    pub default_data_source: Option<String>,
}
