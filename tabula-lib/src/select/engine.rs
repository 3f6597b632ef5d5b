//! Selection evaluation
//!
//! Every stage table is copied under its own read lock, one table at a time.
//! Predicates that touch a single stage narrow that stage's working set up
//! front. The rest run inside the nested loop at the deepest stage they
//! reference, and custom predicates run once every stage is bound.

use std::collections::BTreeMap;
use std::sync::Arc;

use bitvec::prelude::*;

use super::ColumnRef;
use super::ColumnTarget;
use super::Predicate;
use super::Projection;
use super::Selection;
use crate::content::Element;
use crate::content::StripeId;
use crate::content::TableContent;
use crate::table::SharedState;
use crate::table::Table;

/// Copy of one stage table taken when the selection runs.
pub(crate) struct StageData<E> {
    table: SharedState<E>,
    name: Option<String>,
    column_ids: Vec<StripeId>,
    column_titles: Vec<Option<String>>,
    rows: Vec<Vec<Option<E>>>,
}

impl<E: Element> StageData<E> {
    fn capture(table: &SharedState<E>) -> Self {
        let state = table.read();
        let content = state.content();
        Self {
            table: Arc::clone(table),
            name: content.table_name().map(str::to_string),
            column_ids: content.columns().ids(),
            column_titles: content.column_titles(),
            rows: content.to_rows(),
        }
    }
}

impl<E> StageData<E> {
    fn element(&self, row: usize, column: usize) -> Option<&E> {
        self.rows.get(row)?.get(column)?.as_ref()
    }
}

/// Stage and column a reference points to.
type Slot = Option<(usize, usize)>;

fn resolve<E>(stages: &[StageData<E>], column: &ColumnRef<E>) -> Slot {
    let stage = stages
        .iter()
        .position(|stage| Arc::ptr_eq(&stage.table, &column.table))?;
    let position = match column.target {
        ColumnTarget::Position(position) => (position < stages[stage].column_ids.len()).then_some(position)?,
        ColumnTarget::Stripe(id) => stages[stage].column_ids.iter().position(|candidate| *candidate == id)?,
    };
    Some((stage, position))
}

/// One combination of rows, one from each bound stage, seen by a custom
/// predicate.
pub struct JoinedRow<'a, E> {
    stages: &'a [StageData<E>],
    rows: &'a [usize],
}

impl<'a, E> JoinedRow<'a, E> {
    /// Returns the number of bound stages.
    pub fn stage_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the source row position bound for `stage`.
    pub fn row_index(&self, stage: usize) -> Option<usize> {
        self.rows.get(stage).copied()
    }

    /// Returns the element of `column` in the row bound for `stage`.
    pub fn stage_element(&self, stage: usize, column: usize) -> Option<&'a E> {
        let row = *self.rows.get(stage)?;
        self.stages.get(stage)?.element(row, column)
    }

    /// Returns the element a column reference points to, `None` if it is
    /// null or the reference does not resolve.
    pub fn element(&self, column: &ColumnRef<E>) -> Option<&'a E> {
        let (stage, column) = resolve(self.stages, column)?;
        self.stage_element(stage, column)
    }

    fn slot(&self, slot: Slot) -> Option<&'a E> {
        let (stage, column) = slot?;
        self.stage_element(stage, column)
    }
}

/// A predicate with its column references resolved.
enum Compiled<E> {
    EqualColumns(Slot, Slot),
    ColumnValue(Vec<Slot>, Arc<dyn Fn(Option<&E>) -> bool + Send + Sync>),
    And(Vec<Compiled<E>>),
    Or(Vec<Compiled<E>>),
    Not(Box<Compiled<E>>),
    Custom(Arc<dyn Fn(&JoinedRow<'_, E>) -> bool + Send + Sync>),
}

/// The stages a compiled predicate reads.
enum Reach {
    /// Only ever reads this stage.
    Stage(usize),
    /// Reads several stages, the deepest one given.
    Across(usize),
    /// Needs every stage bound.
    Leaf,
}

impl<E: Element> Compiled<E> {
    fn compile(predicate: &Predicate<E>, stages: &[StageData<E>]) -> Self {
        match predicate {
            Predicate::EqualColumns(a, b) => Compiled::EqualColumns(resolve(stages, a), resolve(stages, b)),
            Predicate::ColumnValue { columns, test, .. } => Compiled::ColumnValue(
                columns.iter().map(|column| resolve(stages, column)).collect(),
                Arc::clone(test),
            ),
            Predicate::And(predicates) => {
                Compiled::And(predicates.iter().map(|p| Self::compile(p, stages)).collect())
            }
            Predicate::Or(predicates) => Compiled::Or(predicates.iter().map(|p| Self::compile(p, stages)).collect()),
            Predicate::Not(predicate) => Compiled::Not(Box::new(Self::compile(predicate, stages))),
            Predicate::Custom(test) => Compiled::Custom(Arc::clone(test)),
        }
    }

    /// Collects the referenced stages into `found`. Returns false if the
    /// predicate needs every stage bound.
    fn collect_stages(&self, found: &mut Vec<usize>) -> bool {
        match self {
            Compiled::EqualColumns(a, b) => {
                found.extend([a, b].into_iter().flatten().map(|(stage, _)| *stage));
                true
            }
            Compiled::ColumnValue(slots, _) => {
                found.extend(slots.iter().flatten().map(|(stage, _)| *stage));
                true
            }
            Compiled::And(predicates) | Compiled::Or(predicates) => {
                predicates.iter().all(|predicate| predicate.collect_stages(found))
            }
            Compiled::Not(predicate) => predicate.collect_stages(found),
            Compiled::Custom(_) => false,
        }
    }

    fn reach(&self) -> Reach {
        let mut found = Vec::new();
        if !self.collect_stages(&mut found) {
            return Reach::Leaf;
        }
        let deepest = found.iter().copied().max().unwrap_or(0);
        if found.iter().all(|stage| *stage == deepest) {
            Reach::Stage(deepest)
        } else {
            Reach::Across(deepest)
        }
    }

    fn test(&self, row: &JoinedRow<'_, E>) -> bool {
        match self {
            Compiled::EqualColumns(a, b) => match (row.slot(*a), row.slot(*b)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            Compiled::ColumnValue(slots, test) => slots.iter().all(|slot| test(row.slot(*slot))),
            Compiled::And(predicates) => predicates.iter().all(|predicate| predicate.test(row)),
            Compiled::Or(predicates) => predicates.iter().any(|predicate| predicate.test(row)),
            Compiled::Not(predicate) => !predicate.test(row),
            Compiled::Custom(test) => test(row),
        }
    }
}

/// Prepared evaluation of one selection run.
struct Plan<E> {
    stages: Vec<StageData<E>>,
    candidates: Vec<BitVec>,
    checks: Vec<Vec<Compiled<E>>>,
    projection: Vec<(usize, usize)>,
    limit: Option<usize>,
}

impl<E: Element> Plan<E> {
    fn new(selection: &Selection<E>) -> Self {
        let stages: Vec<StageData<E>> = selection
            .stages
            .iter()
            .map(|stage| StageData::capture(&stage.table))
            .collect();
        let mut candidates: Vec<BitVec> = stages
            .iter()
            .map(|stage| bitvec![1; stage.rows.len()])
            .collect();
        let mut checks: Vec<Vec<Compiled<E>>> = stages.iter().map(|_| Vec::new()).collect();
        let last = stages.len() - 1;

        let predicates = selection
            .stages
            .iter()
            .flat_map(|stage| stage.predicates.iter())
            .chain(selection.filters.iter());
        for predicate in predicates {
            let compiled = Compiled::compile(predicate, &stages);
            match compiled.reach() {
                Reach::Stage(stage) => {
                    let mut rows = vec![0; stage + 1];
                    for row in candidates[stage].iter_ones().collect::<Vec<_>>() {
                        rows[stage] = row;
                        let joined = JoinedRow {
                            stages: &stages,
                            rows: &rows,
                        };
                        if !compiled.test(&joined) {
                            candidates[stage].set(row, false);
                        }
                    }
                }
                Reach::Across(stage) => checks[stage].push(compiled),
                Reach::Leaf => checks[last].push(compiled),
            }
        }

        let projection = project(selection, &stages);
        let limit = match (selection.distinct, selection.top) {
            (false, Some(top)) => Some(selection.skip.saturating_add(top)),
            _ => None,
        };

        Self {
            stages,
            candidates,
            checks,
            projection,
            limit,
        }
    }

    fn run(&self) -> Vec<Vec<Option<E>>> {
        let mut out = Vec::new();
        let mut bound = Vec::with_capacity(self.stages.len());
        self.descend(&mut bound, &mut out);
        out
    }

    /// Binds the next stage. Returns false once the row limit is reached.
    fn descend(&self, bound: &mut Vec<usize>, out: &mut Vec<Vec<Option<E>>>) -> bool {
        let stage = bound.len();
        for row in self.candidates[stage].iter_ones() {
            bound.push(row);
            let joined = JoinedRow {
                stages: &self.stages,
                rows: bound.as_slice(),
            };
            let matched = self.checks[stage].iter().all(|check| check.test(&joined));
            let proceed = if !matched {
                true
            } else if stage + 1 == self.stages.len() {
                out.push(
                    self.projection
                        .iter()
                        .map(|(source, column)| self.stages[*source].element(bound[*source], *column).cloned())
                        .collect(),
                );
                self.limit.is_none_or(|limit| out.len() < limit)
            } else {
                self.descend(bound, out)
            };
            bound.pop();
            if !proceed {
                return false;
            }
        }
        true
    }
}

/// Expands the projection into (stage, column) pairs.
fn project<E>(selection: &Selection<E>, stages: &[StageData<E>]) -> Vec<(usize, usize)> {
    let all = |stage: usize| (0..stages[stage].column_ids.len()).map(move |column| (stage, column));
    if selection.projection.is_empty() {
        return all(0).collect();
    }

    let owns = |stage: usize| {
        selection
            .projection
            .iter()
            .any(|(owner, item)| *owner == stage && matches!(item, Projection::AllColumns | Projection::Column(_)))
    };

    let mut columns = Vec::new();
    for (stage, item) in &selection.projection {
        match item {
            Projection::AllColumns => {
                columns.extend(all(*stage));
                for later in *stage + 1..stages.len() {
                    if !owns(later) {
                        columns.extend(all(later));
                    }
                }
            }
            Projection::Column(column) => {
                if *column < stages[*stage].column_ids.len() {
                    columns.push((*stage, *column));
                }
            }
            Projection::Ref(column) => columns.extend(resolve(stages, column)),
            Projection::AllOf(table) => {
                if let Some(stage) = stages.iter().position(|stage| Arc::ptr_eq(&stage.table, table)) {
                    columns.extend(all(stage));
                }
            }
        }
    }
    columns
}

/// Drops rows equal to an earlier row.
fn dedup<E: PartialEq>(rows: Vec<Vec<Option<E>>>) -> Vec<Vec<Option<E>>> {
    let mut unique: Vec<Vec<Option<E>>> = Vec::with_capacity(rows.len());
    for row in rows {
        if !unique.contains(&row) {
            unique.push(row);
        }
    }
    unique
}

impl<E: Element> Selection<E> {
    fn evaluate(&self) -> (Plan<E>, Vec<Vec<Option<E>>>) {
        let plan = Plan::new(self);
        let mut rows = plan.run();
        if self.distinct {
            rows = dedup(rows);
        }
        let rows: Vec<_> = rows
            .into_iter()
            .skip(self.skip)
            .take(self.top.unwrap_or(usize::MAX))
            .collect();
        log::debug!(
            "[select] {} stages, {} columns, {} rows",
            plan.stages.len(),
            plan.projection.len(),
            rows.len()
        );
        (plan, rows)
    }

    /// Runs the selection and returns the projected rows.
    pub fn as_rows(&self) -> Vec<Vec<Option<E>>> {
        self.evaluate().1
    }

    /// Runs the selection into a new table.
    ///
    /// Column titles are copied from the source columns and the table name
    /// from the table of the first projected column.
    pub fn as_table(&self) -> Table<E> {
        let (plan, rows) = self.evaluate();
        let width = plan.projection.len();
        let mut content = TableContent::from_rows(rows);
        if content.column_count() < width {
            content.grow_to(content.row_count(), width);
        }
        for (position, (stage, column)) in plan.projection.iter().enumerate() {
            let title = plan.stages[*stage].column_titles[*column].clone();
            content.set_column_title(position, title);
        }
        let name = plan
            .projection
            .first()
            .and_then(|(stage, _)| plan.stages[*stage].name.clone());
        content.set_table_name(name);
        Table::from_content(content)
    }

    /// Runs the selection into a map keyed by the first projected column.
    /// Rows with a null key are skipped and later rows replace earlier ones
    /// with the same key.
    pub fn as_sorted_map(&self) -> BTreeMap<E, Vec<Option<E>>>
    where
        E: Ord,
    {
        self.as_rows()
            .into_iter()
            .filter_map(|row| {
                let key = row.first().cloned().flatten()?;
                Some((key, row))
            })
            .collect()
    }
}
