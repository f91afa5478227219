//! Column and parameter values.

use std::cmp::Ordering;
use std::fmt::Display;
use std::ops::Add;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// A single value crossing the execution boundary: a statement
/// parameter going out or a result column coming back.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Datum {
    #[default]
    Null,
    Bigint(i64),
    Double(f64),
    Decimal(Decimal),
    Text(String),
    Bool(bool),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Bigint(value) => Some(*value),
            Datum::Decimal(value) => value.to_i64(),
            Datum::Text(value) => value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Numeric view used by the aggregation units.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Datum::Bigint(value) => Some(Decimal::from(*value)),
            Datum::Decimal(value) => Some(*value),
            Datum::Double(value) => Decimal::from_f64(*value),
            Datum::Text(value) => value.parse().ok(),
            _ => None,
        }
    }
}

impl Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Bigint(value) => write!(f, "{}", value),
            Datum::Double(value) => write!(f, "{}", value),
            Datum::Decimal(value) => write!(f, "{}", value),
            Datum::Text(value) => write!(f, "{}", value),
            Datum::Bool(value) => write!(f, "{}", value),
        }
    }
}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Datum::*;

        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Null, _) => Some(Ordering::Less),
            (_, Null) => Some(Ordering::Greater),
            (Bigint(a), Bigint(b)) => Some(a.cmp(b)),
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Double(a), Double(b)) => a.partial_cmp(b),
            _ => {
                let a = self.as_decimal()?;
                let b = other.as_decimal()?;
                Some(a.cmp(&b))
            }
        }
    }
}

impl Add for Datum {
    type Output = Datum;

    /// Numeric addition with NULL identity, used when summing
    /// partial counts and sums across shards.
    fn add(self, other: Datum) -> Datum {
        use Datum::*;

        match (self, other) {
            (Null, other) => other,
            (datum, Null) => datum,
            (Bigint(a), Bigint(b)) => Bigint(a + b),
            (Double(a), Double(b)) => Double(a + b),
            (a, b) => match (a.as_decimal(), b.as_decimal()) {
                (Some(a), Some(b)) => Decimal(a + b),
                _ => Null,
            },
        }
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Bigint(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Text(value.to_string())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::Text(value)
    }
}

impl From<Decimal> for Datum {
    fn from(value: Decimal) -> Self {
        Datum::Decimal(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_add_identity() {
        assert_eq!(Datum::Null + Datum::Bigint(5), Datum::Bigint(5));
        assert_eq!(Datum::Bigint(5) + Datum::Null, Datum::Bigint(5));
    }

    #[test]
    fn test_add_mixed_numeric() {
        let sum = Datum::Bigint(2) + Datum::Decimal(Decimal::new(25, 1));
        assert_eq!(sum, Datum::Decimal(Decimal::new(45, 1)));
    }

    #[test]
    fn test_ordering() {
        assert!(Datum::Null < Datum::Bigint(i64::MIN));
        assert!(Datum::Bigint(1) < Datum::Bigint(2));
        assert!(Datum::Bigint(2) < Datum::Decimal(Decimal::new(25, 1)));
        assert!(Datum::Text("a".into()) < Datum::Text("b".into()));
    }
}
