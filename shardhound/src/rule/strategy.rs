//! Sharding strategy evaluation.

use std::hash::Hasher;

use fnv::{FnvHashMap, FnvHasher};
use shardhound_config::{AlgorithmKind, MappingKind, ShardValue, Strategy};
use tracing::trace;

use super::Error;

/// Sharding strategy for one dimension: the sharding column
/// plus the algorithm mapping values to target ordinals.
#[derive(Debug, Clone)]
pub struct ShardingStrategy {
    column: String,
    algorithm: Algorithm,
}

#[derive(Debug, Clone)]
enum Algorithm {
    Modulo,
    Hash,
    List(FnvHashMap<ShardValue, usize>),
    Range(Vec<RangeMapping>),
}

#[derive(Debug, Clone)]
struct RangeMapping {
    start: Option<ShardValue>,
    end: Option<ShardValue>,
    index: usize,
}

impl RangeMapping {
    /// Value inside [start, end).
    fn contains(&self, value: &ShardValue) -> bool {
        let above = match &self.start {
            Some(start) => matches!(
                value.partial_cmp(start),
                Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
            ),
            None => true,
        };
        let below = match &self.end {
            Some(end) => matches!(value.partial_cmp(end), Some(std::cmp::Ordering::Less)),
            None => true,
        };
        above && below
    }

    /// Mapping overlaps the query range [start, end], both bounds inclusive
    /// and open-ended when absent.
    fn overlaps(&self, start: Option<&ShardValue>, end: Option<&ShardValue>) -> bool {
        let starts_before_query_end = match (&self.start, end) {
            (Some(mapping_start), Some(end)) => !matches!(
                mapping_start.partial_cmp(end),
                Some(std::cmp::Ordering::Greater)
            ),
            _ => true,
        };
        let ends_after_query_start = match (&self.end, start) {
            (Some(mapping_end), Some(start)) => {
                matches!(mapping_end.partial_cmp(start), Some(std::cmp::Ordering::Greater))
            }
            _ => true,
        };
        starts_before_query_end && ends_after_query_start
    }
}

fn hash(value: &ShardValue) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(value.to_string().as_bytes());
    hasher.finish()
}

impl ShardingStrategy {
    pub fn new(config: &Strategy) -> Self {
        let algorithm = match config.algorithm {
            AlgorithmKind::Modulo => Algorithm::Modulo,
            AlgorithmKind::Hash => Algorithm::Hash,
            AlgorithmKind::List => {
                let mut mapping = FnvHashMap::default();
                for entry in config
                    .mappings
                    .iter()
                    .filter(|m| m.kind == MappingKind::List)
                {
                    for value in &entry.values {
                        mapping.insert(value.clone(), entry.index);
                    }
                }
                Algorithm::List(mapping)
            }
            AlgorithmKind::Range => Algorithm::Range(
                config
                    .mappings
                    .iter()
                    .filter(|m| m.kind == MappingKind::Range)
                    .map(|m| RangeMapping {
                        start: m.start.clone(),
                        end: m.end.clone(),
                        index: m.index,
                    })
                    .collect(),
            ),
        };

        Self {
            column: config.column.clone(),
            algorithm,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Route precise values: each value maps to exactly one target.
    pub fn route_precise<'a>(
        &self,
        targets: &'a [String],
        values: &[ShardValue],
    ) -> Result<Vec<&'a String>, Error> {
        let mut indexes = vec![];
        for value in values {
            let index = match &self.algorithm {
                Algorithm::Modulo => {
                    trace!("sharding using modulo");
                    let integer = value.integer().ok_or_else(|| Error::UnshardableValue {
                        column: self.column.clone(),
                        value: value.to_string(),
                    })?;
                    integer.rem_euclid(targets.len() as i64) as usize
                }
                Algorithm::Hash => {
                    trace!("sharding using hash");
                    (hash(value) % targets.len() as u64) as usize
                }
                Algorithm::List(mapping) => {
                    trace!("sharding using lists");
                    *mapping.get(value).ok_or_else(|| Error::UnshardableValue {
                        column: self.column.clone(),
                        value: value.to_string(),
                    })?
                }
                Algorithm::Range(mappings) => {
                    trace!("sharding using ranges");
                    mappings
                        .iter()
                        .find(|mapping| mapping.contains(value))
                        .map(|mapping| mapping.index)
                        .ok_or_else(|| Error::UnshardableValue {
                            column: self.column.clone(),
                            value: value.to_string(),
                        })?
                }
            };
            if !indexes.contains(&index) {
                indexes.push(index);
            }
        }

        self.resolve(targets, indexes)
    }

    /// Route a value range. The result may be a non-contiguous subset
    /// of targets; algorithms that cannot prune return all of them.
    pub fn route_range<'a>(
        &self,
        targets: &'a [String],
        start: Option<&ShardValue>,
        end: Option<&ShardValue>,
    ) -> Result<Vec<&'a String>, Error> {
        let indexes = match &self.algorithm {
            Algorithm::Modulo => match (start.and_then(|v| v.integer()), end.and_then(|v| v.integer())) {
                (Some(start), Some(end)) if start <= end && (end - start) < targets.len() as i64 => {
                    let mut indexes = vec![];
                    for value in start..=end {
                        let index = value.rem_euclid(targets.len() as i64) as usize;
                        if !indexes.contains(&index) {
                            indexes.push(index);
                        }
                    }
                    indexes
                }
                _ => (0..targets.len()).collect(),
            },

            // Hash order has no relation to value order.
            Algorithm::Hash => (0..targets.len()).collect(),

            Algorithm::List(mapping) => {
                let probe = RangeMapping {
                    start: start.cloned(),
                    end: end.cloned(),
                    index: 0,
                };
                let mut indexes = vec![];
                for (value, index) in mapping {
                    // inclusive upper bound for query ranges
                    let inside = probe.contains(value)
                        || end.map(|end| value == end).unwrap_or(false);
                    if inside && !indexes.contains(index) {
                        indexes.push(*index);
                    }
                }
                if indexes.is_empty() {
                    (0..targets.len()).collect()
                } else {
                    indexes
                }
            }

            Algorithm::Range(mappings) => {
                let mut indexes = vec![];
                for mapping in mappings {
                    if mapping.overlaps(start, end) && !indexes.contains(&mapping.index) {
                        indexes.push(mapping.index);
                    }
                }
                if indexes.is_empty() {
                    (0..targets.len()).collect()
                } else {
                    indexes
                }
            }
        };

        self.resolve(targets, indexes)
    }

    fn resolve<'a>(
        &self,
        targets: &'a [String],
        indexes: Vec<usize>,
    ) -> Result<Vec<&'a String>, Error> {
        indexes
            .into_iter()
            .map(|index| {
                targets.get(index).ok_or(Error::MappingIndex {
                    index,
                    targets: targets.len(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use shardhound_config::ShardMapping;

    fn targets() -> Vec<String> {
        vec!["t_order_0".into(), "t_order_1".into()]
    }

    fn modulo() -> ShardingStrategy {
        ShardingStrategy::new(&Strategy {
            column: "order_id".into(),
            algorithm: AlgorithmKind::Modulo,
            mappings: vec![],
        })
    }

    #[test]
    fn test_modulo_precise() {
        let targets = targets();
        let routed = modulo()
            .route_precise(&targets, &[ShardValue::Integer(1)])
            .unwrap();
        assert_eq!(routed, [&"t_order_1".to_string()]);

        // negative values keep a valid ordinal
        let routed = modulo()
            .route_precise(&targets, &[ShardValue::Integer(-3)])
            .unwrap();
        assert_eq!(routed, [&"t_order_1".to_string()]);
    }

    #[test]
    fn test_modulo_rejects_strings() {
        let targets = targets();
        assert!(matches!(
            modulo().route_precise(&targets, &[ShardValue::String("abc".into())]),
            Err(Error::UnshardableValue { .. })
        ));
    }

    #[test]
    fn test_modulo_narrow_range() {
        let targets = targets();
        let routed = modulo()
            .route_range(
                &targets,
                Some(&ShardValue::Integer(2)),
                Some(&ShardValue::Integer(2)),
            )
            .unwrap();
        assert_eq!(routed, [&"t_order_0".to_string()]);
    }

    #[test]
    fn test_modulo_wide_range_routes_all() {
        let targets = targets();
        let routed = modulo()
            .route_range(
                &targets,
                Some(&ShardValue::Integer(0)),
                Some(&ShardValue::Integer(100)),
            )
            .unwrap();
        assert_eq!(routed.len(), 2);
    }

    #[test]
    fn test_hash_deterministic() {
        let strategy = ShardingStrategy::new(&Strategy {
            column: "name".into(),
            algorithm: AlgorithmKind::Hash,
            mappings: vec![],
        });
        let targets = targets();

        let first = strategy
            .route_precise(&targets, &[ShardValue::String("abc".into())])
            .unwrap();
        let second = strategy
            .route_precise(&targets, &[ShardValue::String("abc".into())])
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_range_mappings_non_contiguous() {
        let strategy = ShardingStrategy::new(&Strategy {
            column: "order_id".into(),
            algorithm: AlgorithmKind::Range,
            mappings: vec![
                ShardMapping {
                    kind: MappingKind::Range,
                    values: vec![],
                    start: None,
                    end: Some(ShardValue::Integer(100)),
                    index: 0,
                },
                ShardMapping {
                    kind: MappingKind::Range,
                    values: vec![],
                    start: Some(ShardValue::Integer(100)),
                    end: None,
                    index: 1,
                },
            ],
        });
        let targets = targets();

        let routed = strategy
            .route_precise(&targets, &[ShardValue::Integer(99)])
            .unwrap();
        assert_eq!(routed, [&"t_order_0".to_string()]);

        let routed = strategy
            .route_range(
                &targets,
                Some(&ShardValue::Integer(50)),
                Some(&ShardValue::Integer(150)),
            )
            .unwrap();
        assert_eq!(routed.len(), 2);
    }

    #[test]
    fn test_list_mapping() {
        let strategy = ShardingStrategy::new(&Strategy {
            column: "country".into(),
            algorithm: AlgorithmKind::List,
            mappings: vec![
                ShardMapping {
                    kind: MappingKind::List,
                    values: vec!["us".into(), "ca".into()],
                    start: None,
                    end: None,
                    index: 0,
                },
                ShardMapping {
                    kind: MappingKind::List,
                    values: vec!["de".into()],
                    start: None,
                    end: None,
                    index: 1,
                },
            ],
        });
        let targets = targets();

        let routed = strategy
            .route_precise(&targets, &[ShardValue::String("de".into())])
            .unwrap();
        assert_eq!(routed, [&"t_order_1".to_string()]);

        assert!(strategy
            .route_precise(&targets, &[ShardValue::String("fr".into())])
            .is_err());
    }
}
