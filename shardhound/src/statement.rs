//! Bound statement context.
//!
//! Plain data handed to this pipeline by an external SQL
//! parser/binder: referenced tables, predicates, select shape,
//! pagination, parameter markers. Nothing here inspects SQL text.

use crate::datum::Datum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    ShowCreateTable,
    ShowIndex,
    ShowTableStatus,
    ShowTables,
    Ddl,
}

impl StatementKind {
    pub fn is_show(&self) -> bool {
        matches!(
            self,
            StatementKind::ShowCreateTable
                | StatementKind::ShowIndex
                | StatementKind::ShowTableStatus
                | StatementKind::ShowTables
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    Eq,
    In,
    Between,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

/// A predicate operand: a literal from the SQL text or a
/// `?` marker resolved against the runtime parameter list.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateValue {
    Literal(Datum),
    Parameter(usize),
}

/// One `column <op> value(s)` predicate bound to a table.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub table: String,
    pub column: String,
    pub op: PredicateOp,
    pub values: Vec<PredicateValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// ORDER BY / GROUP BY item. The expression is the text as
/// written; merge-time resolution goes through column labels.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub expr: String,
    pub direction: Direction,
}

impl OrderItem {
    pub fn asc(expr: impl ToString) -> Self {
        Self {
            expr: expr.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(expr: impl ToString) -> Self {
        Self {
            expr: expr.to_string(),
            direction: Direction::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationKind {
    Count,
    Sum,
    Max,
    Min,
    Avg,
}

/// One select item, with its aggregation function if it is one.
#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: String,
    pub alias: Option<String>,
    pub aggregation: Option<AggregationKind>,
}

impl SelectItem {
    pub fn column(expr: impl ToString) -> Self {
        Self {
            expr: expr.to_string(),
            alias: None,
            aggregation: None,
        }
    }

    pub fn aggregate(kind: AggregationKind, expr: impl ToString) -> Self {
        Self {
            expr: expr.to_string(),
            alias: None,
            aggregation: Some(kind),
        }
    }

    pub fn with_alias(mut self, alias: impl ToString) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Label the caller sees for this column.
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.expr)
    }
}

/// A LIMIT/OFFSET value: a literal with its span in the original
/// SQL, or a `?` marker ordinal.
#[derive(Debug, Clone, PartialEq)]
pub enum PaginationValue {
    Literal { value: u64, start: usize, len: usize },
    Parameter(usize),
}

#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub offset: Option<PaginationValue>,
    pub row_count: Option<PaginationValue>,
}

#[derive(Debug, Clone)]
pub struct SelectContext {
    pub items: Vec<SelectItem>,
    /// Byte offset just past the select-item list, where derived
    /// items are appended.
    pub items_stop: usize,
    pub order_by: Vec<OrderItem>,
    pub group_by: Vec<OrderItem>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone)]
pub struct InsertContext {
    pub columns: Vec<String>,
    /// Byte offset of the `)` closing the column list.
    pub columns_stop: usize,
    /// Byte offset of the `)` closing each VALUES row.
    pub values_stops: Vec<usize>,
    /// True when row values are bound as `?` parameters.
    pub parameterized: bool,
}

#[derive(Debug, Clone)]
pub struct StatementContext {
    pub kind: StatementKind,
    pub tables: Vec<String>,
    pub predicates: Vec<Predicate>,
    pub select: Option<SelectContext>,
    pub insert: Option<InsertContext>,
}

impl StatementContext {
    pub fn new(kind: StatementKind, tables: impl IntoIterator<Item = impl ToString>) -> Self {
        Self {
            kind,
            tables: tables.into_iter().map(|table| table.to_string()).collect(),
            predicates: vec![],
            select: None,
            insert: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn with_select(mut self, select: SelectContext) -> Self {
        self.select = Some(select);
        self
    }

    pub fn with_insert(mut self, insert: InsertContext) -> Self {
        self.insert = Some(insert);
        self
    }

    /// Does any select item aggregate across rows?
    pub fn has_aggregation(&self) -> bool {
        self.select
            .as_ref()
            .map(|select| select.items.iter().any(|item| item.aggregation.is_some()))
            .unwrap_or(false)
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.select.as_ref().and_then(|select| select.pagination.as_ref())
    }
}
