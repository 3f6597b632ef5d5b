//! Select / join queries over tables
//!
//! A [`Selection`] is built from `table.select()` and evaluated by one of its
//! terminals. Joins have inner-join semantics: a stage without a predicate is
//! a Cartesian product with the stages before it.

mod engine;
mod predicate;

pub use engine::JoinedRow;
pub use predicate::*;

use std::ops::Range;
use std::sync::Arc;

use regex::Regex;

use crate::content::Element;
use crate::table::SharedState;
use crate::table::Table;

/// One projection request, recorded with the stage it was made in.
enum Projection<E> {
    /// Every column of the stage, and of later stages that project nothing
    /// of their own.
    AllColumns,
    /// One column of the stage by position.
    Column(usize),
    /// A column of whichever stage holds its table.
    Ref(ColumnRef<E>),
    /// Every column of the first stage holding this table.
    AllOf(SharedState<E>),
}

/// One table in the join chain with its join predicates.
struct Stage<E> {
    table: SharedState<E>,
    predicates: Vec<Predicate<E>>,
}

/// A lazily evaluated select query.
///
/// # Example
///
/// ```
/// use tabula_lib::Table;
///
/// let people: Table<String> = Table::from_rows([["1", "ada"], ["2", "alan"]].map(|row| row.map(String::from)));
/// let pets: Table<String> = Table::from_rows([["2", "cat"], ["1", "dog"], ["1", "owl"]].map(|row| row.map(String::from)));
///
/// let rows = people
///     .select()
///     .column(1)
///     .inner_join(&pets)
///     .on_equal(people.col(0), pets.col(0))
///     .column(1)
///     .as_rows();
/// assert_eq!(rows.len(), 3);
/// assert_eq!(rows[0], vec![Some("ada".to_string()), Some("dog".to_string())]);
/// ```
pub struct Selection<E> {
    stages: Vec<Stage<E>>,
    projection: Vec<(usize, Projection<E>)>,
    filters: Vec<Predicate<E>>,
    distinct: bool,
    skip: usize,
    top: Option<usize>,
}

impl<E: Element> Table<E> {
    /// Starts a select query with this table as the base stage.
    pub fn select(&self) -> Selection<E> {
        Selection {
            stages: vec![Stage {
                table: Arc::clone(self.shared()),
                predicates: Vec::new(),
            }],
            projection: Vec::new(),
            filters: Vec::new(),
            distinct: false,
            skip: 0,
            top: None,
        }
    }
}

impl<E: Element> Selection<E> {
    fn current(&self) -> usize {
        self.stages.len() - 1
    }

    fn push_projection(mut self, item: Projection<E>) -> Self {
        let stage = self.current();
        self.projection.push((stage, item));
        self
    }

    // =========================================================================
    // Projection
    // =========================================================================

    /// Projects every column of the current stage and of the later stages
    /// that project no columns of their own.
    pub fn all_columns(self) -> Self {
        self.push_projection(Projection::AllColumns)
    }

    /// Projects every column of `table`.
    pub fn all_columns_of(self, table: &Table<E>) -> Self {
        self.push_projection(Projection::AllOf(Arc::clone(table.shared())))
    }

    /// Projects the column at `column` of the current stage.
    pub fn column(self, column: usize) -> Self {
        self.push_projection(Projection::Column(column))
    }

    /// Projects several columns of the current stage.
    pub fn columns(self, columns: impl IntoIterator<Item = usize>) -> Self {
        columns.into_iter().fold(self, Self::column)
    }

    /// Projects a range of columns of the current stage.
    pub fn column_range(self, columns: Range<usize>) -> Self {
        self.columns(columns)
    }

    /// Projects one specific column.
    pub fn column_ref(self, column: impl Into<ColumnRef<E>>) -> Self {
        self.push_projection(Projection::Ref(column.into()))
    }

    // =========================================================================
    // Joins
    // =========================================================================

    /// Joins `table` as a new stage.
    pub fn join(mut self, table: &Table<E>) -> Self {
        self.stages.push(Stage {
            table: Arc::clone(table.shared()),
            predicates: Vec::new(),
        });
        self
    }

    /// Same as [`join`](Self::join).
    pub fn inner_join(self, table: &Table<E>) -> Self {
        self.join(table)
    }

    /// Adds a join predicate to the current stage.
    pub fn on(mut self, predicate: Predicate<E>) -> Self {
        let stage = self.current();
        self.stages[stage].predicates.push(predicate);
        self
    }

    /// Joins on two columns being equal.
    pub fn on_equal(self, a: impl Into<ColumnRef<E>>, b: impl Into<ColumnRef<E>>) -> Self {
        self.on(Predicate::equal_columns(a, b))
    }

    /// Joins on a column holding `value`.
    pub fn on_value(self, column: impl Into<ColumnRef<E>>, value: impl Into<E>) -> Self {
        self.on(Predicate::column_equals(column, value))
    }

    /// Joins on a column matching `pattern`.
    pub fn on_like(self, column: impl Into<ColumnRef<E>>, pattern: Regex) -> Self
    where
        E: std::fmt::Display,
    {
        self.on(Predicate::column_like(column, pattern))
    }

    /// Joins on a column holding one of `values`.
    pub fn on_within<T: Into<E>>(self, column: impl Into<ColumnRef<E>>, values: impl IntoIterator<Item = T>) -> Self {
        self.on(Predicate::column_within(column, values))
    }

    // =========================================================================
    // Filters
    // =========================================================================

    /// Keeps the joined rows satisfying `predicate`.
    pub fn filter(mut self, predicate: Predicate<E>) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Keeps the rows where `column` equals `value`.
    pub fn where_equal(self, column: impl Into<ColumnRef<E>>, value: impl Into<E>) -> Self {
        self.filter(Predicate::column_equals(column, value))
    }

    /// Keeps the rows where `column` matches `pattern`.
    pub fn where_like(self, column: impl Into<ColumnRef<E>>, pattern: Regex) -> Self
    where
        E: std::fmt::Display,
    {
        self.filter(Predicate::column_like(column, pattern))
    }

    /// Keeps the rows where `column` holds one of `values`.
    pub fn where_within<T: Into<E>>(self, column: impl Into<ColumnRef<E>>, values: impl IntoIterator<Item = T>) -> Self {
        self.filter(Predicate::column_within(column, values))
    }

    /// Keeps the rows where `column` lies within `low..=high`.
    pub fn where_between(self, column: impl Into<ColumnRef<E>>, low: impl Into<E>, high: impl Into<E>) -> Self
    where
        E: PartialOrd,
    {
        self.filter(Predicate::column_between([column.into()], low, high))
    }

    // =========================================================================
    // Result shaping
    // =========================================================================

    /// Drops rows equal to an earlier result row.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Skips the first `count` result rows. Skipping happens before `top`
    /// regardless of call order.
    pub fn skip(mut self, count: usize) -> Self {
        self.skip = count;
        self
    }

    /// Limits the result to `count` rows, counted after `skip`.
    pub fn top(mut self, count: usize) -> Self {
        self.top = Some(count);
        self
    }
}

impl<E> std::fmt::Debug for Selection<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("stages", &self.stages.len())
            .field("filters", &self.filters)
            .field("distinct", &self.distinct)
            .field("skip", &self.skip)
            .field("top", &self.top)
            .finish()
    }
}
