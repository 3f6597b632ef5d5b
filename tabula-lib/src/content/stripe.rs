//! Stripe metadata and ordered stripe lists

use std::collections::HashMap;

/// Stable identifier of a row or column.
///
/// Ids are handed out by a per-table counter and never reused, so a handle
/// holding an id can always tell whether its stripe still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StripeId(pub(crate) u64);

impl StripeId {
    /// Returns the raw id value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for StripeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Metadata of one row or column.
#[derive(Debug, Clone, PartialEq)]
pub struct StripeData {
    id: StripeId,
    title: Option<String>,
    revision: u64,
}

impl StripeData {
    pub(crate) fn new(id: StripeId) -> Self {
        Self {
            id,
            title: None,
            revision: 0,
        }
    }

    /// Returns the stable id of the stripe.
    pub fn id(&self) -> StripeId {
        self.id
    }

    /// Returns the title, if one is set.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the revision counter.
    ///
    /// The counter grows whenever a cell of the stripe changes or a stripe is
    /// added to or removed from the orthogonal list.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_title(&mut self, title: Option<String>) {
        self.title = title;
        self.touch();
    }

    pub(crate) fn take_title(&mut self) -> Option<String> {
        self.title.take()
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }
}

/// Ordered list of stripes with id-to-position lookup.
#[derive(Debug, Clone, Default)]
pub struct StripeList {
    stripes: Vec<StripeData>,
    positions: HashMap<StripeId, usize>,
}

impl StripeList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stripes.
    pub fn len(&self) -> usize {
        self.stripes.len()
    }

    /// Returns true if the list holds no stripe.
    pub fn is_empty(&self) -> bool {
        self.stripes.is_empty()
    }

    /// Returns the stripe at `position`.
    pub fn get(&self, position: usize) -> Option<&StripeData> {
        self.stripes.get(position)
    }

    /// Returns the id of the stripe at `position`.
    pub fn id_at(&self, position: usize) -> Option<StripeId> {
        self.stripes.get(position).map(StripeData::id)
    }

    /// Returns the live position of the stripe with the given id.
    pub fn position_of(&self, id: StripeId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Returns the stripe with the given id.
    pub fn by_id(&self, id: StripeId) -> Option<&StripeData> {
        self.position_of(id).and_then(|position| self.stripes.get(position))
    }

    /// Returns the position of the first stripe carrying `title`.
    pub fn position_of_title(&self, title: &str) -> Option<usize> {
        self.stripes.iter().position(|stripe| stripe.title() == Some(title))
    }

    /// Iterates over the stripes in order.
    pub fn iter(&self) -> std::slice::Iter<'_, StripeData> {
        self.stripes.iter()
    }

    /// Returns the ids of all stripes in order.
    pub fn ids(&self) -> Vec<StripeId> {
        self.stripes.iter().map(StripeData::id).collect()
    }

    /// Returns the titles of all stripes in order.
    pub fn titles(&self) -> Vec<Option<String>> {
        self.stripes.iter().map(|stripe| stripe.title.clone()).collect()
    }

    pub(crate) fn get_mut(&mut self, position: usize) -> Option<&mut StripeData> {
        self.stripes.get_mut(position)
    }

    pub(crate) fn insert(&mut self, position: usize, stripe: StripeData) -> usize {
        let position = position.min(self.stripes.len());
        self.stripes.insert(position, stripe);
        self.reindex_from(position);
        position
    }

    pub(crate) fn remove(&mut self, position: usize) -> Option<StripeData> {
        if position >= self.stripes.len() {
            return None;
        }
        let stripe = self.stripes.remove(position);
        self.positions.remove(&stripe.id);
        self.reindex_from(position);
        Some(stripe)
    }

    pub(crate) fn swap(&mut self, a: usize, b: usize) -> bool {
        if a >= self.stripes.len() || b >= self.stripes.len() {
            return false;
        }
        self.stripes.swap(a, b);
        self.positions.insert(self.stripes[a].id, a);
        self.positions.insert(self.stripes[b].id, b);
        true
    }

    pub(crate) fn move_stripe(&mut self, from: usize, to: usize) -> bool {
        if from >= self.stripes.len() || to >= self.stripes.len() {
            return false;
        }
        let stripe = self.stripes.remove(from);
        self.stripes.insert(to, stripe);
        self.reindex_from(from.min(to));
        true
    }

    /// Rearranges the stripes so that the new position `i` holds the stripe
    /// previously at `order[i]`. `order` must be a permutation.
    pub(crate) fn reorder(&mut self, order: &[usize]) {
        let mut previous: Vec<Option<StripeData>> =
            std::mem::take(&mut self.stripes).into_iter().map(Some).collect();
        self.stripes = order
            .iter()
            .filter_map(|&position| previous.get_mut(position).and_then(Option::take))
            .collect();
        // stripes the order did not mention keep their relative order at the end
        self.stripes.extend(previous.into_iter().flatten());
        self.reindex_from(0);
    }

    pub(crate) fn touch_all(&mut self) {
        self.stripes.iter_mut().for_each(StripeData::touch);
    }

    pub(crate) fn clear(&mut self) {
        self.stripes.clear();
        self.positions.clear();
    }

    fn reindex_from(&mut self, position: usize) {
        for (index, stripe) in self.stripes.iter().enumerate().skip(position) {
            self.positions.insert(stripe.id, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(count: u64) -> StripeList {
        let mut list = StripeList::new();
        for id in 0..count {
            list.insert(id as usize, StripeData::new(StripeId(id)));
        }
        list
    }

    #[test]
    fn test_positions_follow_insert_and_remove() {
        let mut list = list_of(3);
        list.insert(0, StripeData::new(StripeId(10)));
        assert_eq!(list.position_of(StripeId(10)), Some(0));
        assert_eq!(list.position_of(StripeId(2)), Some(3));

        list.remove(1);
        assert_eq!(list.position_of(StripeId(0)), None);
        assert_eq!(list.position_of(StripeId(2)), Some(2));
    }

    #[test]
    fn test_reorder_is_a_permutation() {
        let mut list = list_of(4);
        list.reorder(&[3, 1, 0, 2]);
        assert_eq!(
            list.ids(),
            vec![StripeId(3), StripeId(1), StripeId(0), StripeId(2)]
        );
        assert_eq!(list.position_of(StripeId(2)), Some(3));
    }

    #[test]
    fn test_move_stripe() {
        let mut list = list_of(4);
        assert!(list.move_stripe(0, 2));
        assert_eq!(
            list.ids(),
            vec![StripeId(1), StripeId(2), StripeId(0), StripeId(3)]
        );
        assert!(!list.move_stripe(0, 9));
    }
}
