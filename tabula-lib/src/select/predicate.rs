//! Selection predicates and column references

use std::fmt::Display;
use std::sync::Arc;

use regex::Regex;

use super::engine::JoinedRow;
use crate::content::Element;
use crate::content::StripeId;
use crate::table::Column;
use crate::table::SharedState;
use crate::table::Table;

/// How a [`ColumnRef`] finds its column in the table snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnTarget {
    /// Column at this position when the selection runs.
    Position(usize),
    /// Column with this id, wherever it is when the selection runs.
    Stripe(StripeId),
}

/// Reference to a column of one table, used in projections and predicates.
///
/// A reference resolves to the first stage of a selection whose table is the
/// referenced table. A reference that does not resolve reads as null.
pub struct ColumnRef<E> {
    pub(crate) table: SharedState<E>,
    pub(crate) target: ColumnTarget,
}

impl<E> Clone for ColumnRef<E> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            target: self.target,
        }
    }
}

impl<E> std::fmt::Debug for ColumnRef<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target {
            ColumnTarget::Position(column) => write!(f, "column {column}"),
            ColumnTarget::Stripe(id) => write!(f, "column {id}"),
        }
    }
}

impl<E: Element> Table<E> {
    /// Refers to the column at `column` of this table. The position is
    /// resolved when the selection runs.
    pub fn col(&self, column: usize) -> ColumnRef<E> {
        ColumnRef {
            table: Arc::clone(self.shared()),
            target: ColumnTarget::Position(column),
        }
    }
}

impl<E: Element> From<&Column<E>> for ColumnRef<E> {
    fn from(column: &Column<E>) -> Self {
        Self {
            table: Arc::clone(column.shared()),
            target: ColumnTarget::Stripe(column.id()),
        }
    }
}

impl<E: Element> From<Column<E>> for ColumnRef<E> {
    fn from(column: Column<E>) -> Self {
        Self::from(&column)
    }
}

type ValueTest<E> = Arc<dyn Fn(Option<&E>) -> bool + Send + Sync>;
type RowTest<E> = Arc<dyn Fn(&JoinedRow<'_, E>) -> bool + Send + Sync>;

/// A condition on the joined rows of a selection.
///
/// # Example
///
/// ```
/// use tabula_lib::Table;
/// use tabula_lib::select::Predicate;
///
/// let table: Table<i32> = Table::from_rows([[1, 2], [3, 4], [5, 6]]);
/// let predicate = Predicate::column_between([table.col(0)], 2, 5)
///     .and_also(Predicate::column_equals(table.col(1), 4).not());
///
/// let rows = table.select().filter(predicate).as_rows();
/// assert_eq!(rows, vec![vec![Some(5), Some(6)]]);
/// ```
pub enum Predicate<E> {
    /// Both columns hold equal, non-null elements.
    EqualColumns(ColumnRef<E>, ColumnRef<E>),
    /// Every listed column passes the test.
    ColumnValue {
        /// Columns to test.
        columns: Vec<ColumnRef<E>>,
        /// Human-readable form of the test.
        description: String,
        /// The test applied to each element.
        test: ValueTest<E>,
    },
    /// All predicates hold.
    And(Vec<Predicate<E>>),
    /// At least one predicate holds.
    Or(Vec<Predicate<E>>),
    /// The predicate does not hold.
    Not(Box<Predicate<E>>),
    /// User-supplied test of a whole joined row.
    Custom(RowTest<E>),
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        match self {
            Predicate::EqualColumns(a, b) => Predicate::EqualColumns(a.clone(), b.clone()),
            Predicate::ColumnValue {
                columns,
                description,
                test,
            } => Predicate::ColumnValue {
                columns: columns.clone(),
                description: description.clone(),
                test: Arc::clone(test),
            },
            Predicate::And(predicates) => Predicate::And(predicates.clone()),
            Predicate::Or(predicates) => Predicate::Or(predicates.clone()),
            Predicate::Not(predicate) => Predicate::Not(predicate.clone()),
            Predicate::Custom(test) => Predicate::Custom(Arc::clone(test)),
        }
    }
}

impl<E> std::fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::EqualColumns(a, b) => write!(f, "{a:?} = {b:?}"),
            Predicate::ColumnValue {
                columns,
                description,
                ..
            } => write!(f, "{columns:?} {description}"),
            Predicate::And(predicates) => f.debug_tuple("And").field(predicates).finish(),
            Predicate::Or(predicates) => f.debug_tuple("Or").field(predicates).finish(),
            Predicate::Not(predicate) => f.debug_tuple("Not").field(predicate).finish(),
            Predicate::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl<E: Element> Predicate<E> {
    /// Creates a predicate that holds when both columns are equal and non-null.
    pub fn equal_columns(a: impl Into<ColumnRef<E>>, b: impl Into<ColumnRef<E>>) -> Self {
        Predicate::EqualColumns(a.into(), b.into())
    }

    /// Creates a predicate that holds when the column equals `value`.
    pub fn column_equals(column: impl Into<ColumnRef<E>>, value: impl Into<E>) -> Self {
        let value = value.into();
        let description = format!("= {value:?}");
        Self::value_test(vec![column.into()], description, move |element| {
            element == Some(&value)
        })
    }

    /// Creates a predicate that holds when the column is null.
    pub fn column_is_null(column: impl Into<ColumnRef<E>>) -> Self {
        Self::value_test(vec![column.into()], "is null".to_string(), |element| element.is_none())
    }

    /// Creates a predicate that holds when the column equals one of `values`.
    pub fn column_within<T: Into<E>>(column: impl Into<ColumnRef<E>>, values: impl IntoIterator<Item = T>) -> Self {
        let values: Vec<E> = values.into_iter().map(Into::into).collect();
        let description = format!("in {values:?}");
        Self::value_test(vec![column.into()], description, move |element| {
            element.is_some_and(|element| values.contains(element))
        })
    }

    /// Creates a predicate that holds when every listed column lies within
    /// `low..=high`. Nulls never match.
    pub fn column_between<C: Into<ColumnRef<E>>>(
        columns: impl IntoIterator<Item = C>,
        low: impl Into<E>,
        high: impl Into<E>,
    ) -> Self
    where
        E: PartialOrd,
    {
        let (low, high) = (low.into(), high.into());
        let description = format!("between {low:?} and {high:?}");
        let columns = columns.into_iter().map(Into::into).collect();
        Self::value_test(columns, description, move |element| {
            element.is_some_and(|element| *element >= low && *element <= high)
        })
    }

    /// Creates a predicate that holds when the displayed column value
    /// matches `pattern`. Nulls never match.
    pub fn column_like(column: impl Into<ColumnRef<E>>, pattern: Regex) -> Self
    where
        E: Display,
    {
        let description = format!("like /{pattern}/");
        Self::value_test(vec![column.into()], description, move |element| {
            element.is_some_and(|element| pattern.is_match(&element.to_string()))
        })
    }

    /// Creates a predicate from a test of one column's element.
    pub fn column_matches(
        column: impl Into<ColumnRef<E>>,
        test: impl Fn(Option<&E>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::value_test(vec![column.into()], "matches custom test".to_string(), test)
    }

    /// Creates a predicate from a test of the whole joined row. Custom
    /// predicates run once all stages are joined.
    pub fn custom(test: impl Fn(&JoinedRow<'_, E>) -> bool + Send + Sync + 'static) -> Self {
        Predicate::Custom(Arc::new(test))
    }

    fn value_test(
        columns: Vec<ColumnRef<E>>,
        description: String,
        test: impl Fn(Option<&E>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Predicate::ColumnValue {
            columns,
            description,
            test: Arc::new(test),
        }
    }

    /// Creates a logical AND of multiple predicates.
    pub fn and(predicates: impl IntoIterator<Item = Predicate<E>>) -> Self {
        Predicate::And(predicates.into_iter().collect())
    }

    /// Creates a logical OR of multiple predicates.
    pub fn or(predicates: impl IntoIterator<Item = Predicate<E>>) -> Self {
        Predicate::Or(predicates.into_iter().collect())
    }

    /// Combines this predicate with another using logical AND.
    pub fn and_also(self, other: Predicate<E>) -> Self {
        match self {
            Predicate::And(mut predicates) => {
                predicates.push(other);
                Predicate::And(predicates)
            }
            _ => Predicate::And(vec![self, other]),
        }
    }

    /// Combines this predicate with another using logical OR.
    pub fn or_else(self, other: Predicate<E>) -> Self {
        match self {
            Predicate::Or(mut predicates) => {
                predicates.push(other);
                Predicate::Or(predicates)
            }
            _ => Predicate::Or(vec![self, other]),
        }
    }

    /// Negates this predicate.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            _ => Predicate::Not(Box::new(self)),
        }
    }
}
