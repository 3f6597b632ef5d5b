//! Live indexes over table content
//!
//! An index is an observer registered on its table. It is updated under the
//! table's write lock by every mutation, so it never goes stale.

mod column;
mod keyed;

pub use column::*;
pub use keyed::*;

use std::any::Any;
use std::sync::Arc;
use std::sync::Weak;

use crate::content::Element;
use crate::content::StripeId;
use crate::event::TableEventHandler;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IndexKey {
    Column(StripeId),
    Keyed(String),
}

/// Registered index: the observer side and the typed instance for reuse.
///
/// Both are weak. An index lives as long as one of its handles does; slots
/// of dropped indexes are pruned on the next registration.
pub(crate) struct IndexSlot<E> {
    pub(crate) key: IndexKey,
    pub(crate) observer: Weak<dyn TableEventHandler<E>>,
    instance: Weak<dyn Any + Send + Sync>,
}

impl<E: Element> IndexSlot<E> {
    fn new<T>(key: IndexKey, inner: &Arc<T>) -> Self
    where
        T: TableEventHandler<E> + Any + Send + Sync,
    {
        let observer: Arc<dyn TableEventHandler<E>> = inner.clone();
        let instance: Arc<dyn Any + Send + Sync> = inner.clone();
        Self {
            key,
            observer: Arc::downgrade(&observer),
            instance: Arc::downgrade(&instance),
        }
    }
}

impl<E> IndexSlot<E> {
    pub(crate) fn is_live(&self) -> bool {
        self.observer.strong_count() > 0
    }

    pub(crate) fn watches_column(&self, column: StripeId) -> bool {
        self.key == IndexKey::Column(column)
    }
}

/// Creates and reuses the indexes of one table.
pub struct IndexManager<'a, E> {
    table: &'a Table<E>,
}

impl<E: Element> Table<E> {
    /// Returns the index manager of this table.
    pub fn index(&self) -> IndexManager<'_, E> {
        IndexManager { table: self }
    }
}

impl<E: Element> IndexManager<'_, E> {
    /// Returns the index of `column`, creating it on first use. Later calls
    /// for the same column return the same index while a handle to it is
    /// alive. `None` if the column does not exist.
    pub fn of(&self, column: usize) -> Option<TableIndex<E>>
    where
        E: Ord,
    {
        let shared = self.table.shared();
        let mut state = shared.write();
        let id = state.content().column_id(column)?;
        let key = IndexKey::Column(id);
        state.indexes.retain(IndexSlot::is_live);

        if let Some(slot) = state.indexes.iter().find(|slot| slot.key == key)
            && let Some(instance) = slot.instance.upgrade()
            && let Ok(instance) = instance.downcast::<ColumnIndex<E>>()
        {
            log::debug!("[index] reusing index of column {}", column);
            return Some(TableIndex::from_inner(instance));
        }

        let inner = Arc::new(ColumnIndex::new(id, Arc::downgrade(shared)));
        inner.rebuild(state.content());
        log::debug!("[index] created index of column {} with {} keys", column, inner.key_count());
        state.indexes.push(IndexSlot::new(key, &inner));
        Some(TableIndex::from_inner(inner))
    }

    /// Returns the index of the column handle's column.
    pub fn of_column(&self, column: &crate::table::Column<E>) -> Option<TableIndex<E>>
    where
        E: Ord,
    {
        self.of(column.index()?)
    }

    /// Returns the index named `name`, creating it with `extractor` on first
    /// use. A later call with the same name and key type returns the existing
    /// index and ignores `extractor`.
    pub fn keyed<K, F>(&self, name: &str, extractor: F) -> KeyedIndex<E, K>
    where
        K: Ord + Clone + Send + Sync + 'static,
        F: Fn(&[Option<E>]) -> Option<K> + Send + Sync + 'static,
    {
        let shared = self.table.shared();
        let mut state = shared.write();
        let key = IndexKey::Keyed(name.to_string());
        state.indexes.retain(IndexSlot::is_live);

        if let Some(position) = state.indexes.iter().position(|slot| slot.key == key) {
            let instance = state.indexes[position].instance.upgrade();
            match instance.map(|instance| instance.downcast::<RowKeyIndex<E, K>>()) {
                Some(Ok(instance)) => {
                    log::debug!("[index] reusing keyed index '{}'", name);
                    return KeyedIndex::from_inner(instance);
                }
                _ => {
                    log::debug!("[index] replacing keyed index '{}' with a new key type", name);
                    state.indexes.remove(position);
                }
            }
        }

        let inner = Arc::new(RowKeyIndex::new(Arc::downgrade(shared), Box::new(extractor)));
        inner.rebuild(state.content());
        log::debug!("[index] created keyed index '{}' with {} keys", name, inner.key_count());
        state.indexes.push(IndexSlot::new(key, &inner));
        KeyedIndex::from_inner(inner)
    }

    /// Returns the number of live indexes.
    pub fn len(&self) -> usize {
        self.table.shared().read().indexes.iter().filter(|slot| slot.is_live()).count()
    }

    /// Returns true if no index is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
