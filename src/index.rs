//! Adjacency index over a flat category snapshot.

use crate::model::{Category, CategoryId};
use std::collections::{HashMap, HashSet, VecDeque};

/// O(1) lookups by id and by parent over a borrowed slice of records.
///
/// Child lists keep the order of the input slice; sorting for display is the tree
/// builder's job.
pub struct CategoryIndex<'a> {
    by_id: HashMap<CategoryId, &'a Category>,
    children: HashMap<Option<CategoryId>, Vec<&'a Category>>,
}

impl<'a> CategoryIndex<'a> {
    pub fn new(categories: &'a [Category]) -> Self {
        let mut by_id = HashMap::with_capacity(categories.len());
        let mut children: HashMap<Option<CategoryId>, Vec<&'a Category>> = HashMap::new();
        for category in categories {
            by_id.insert(category.id, category);
            children.entry(category.parent_id).or_default().push(category);
        }
        Self { by_id, children }
    }

    pub fn get(&self, id: CategoryId) -> Option<&'a Category> {
        self.by_id.get(&id).copied()
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Records whose `parent_id` equals `parent` (`None` for stored roots).
    pub fn children_of(&self, parent: Option<CategoryId>) -> &[&'a Category] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All descendants of `id` in breadth-first order, excluding `id` itself.
    ///
    /// Guarded by a visited set, so corrupted cyclic links terminate.
    pub fn descendants(&self, id: CategoryId) -> Vec<&'a Category> {
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            for child in self.children_of(Some(current)) {
                if seen.insert(child.id) {
                    out.push(*child);
                    queue.push_back(child.id);
                }
            }
        }
        out
    }

    /// Longest downward distance from `id` to a descendant leaf (0 for a leaf).
    pub fn subtree_height(&self, id: CategoryId) -> usize {
        let mut seen = HashSet::from([id]);
        let mut frontier = vec![id];
        let mut height = 0;
        loop {
            let next: Vec<CategoryId> = frontier
                .iter()
                .flat_map(|parent| self.children_of(Some(*parent)))
                .filter(|child| seen.insert(child.id))
                .map(|child| child.id)
                .collect();
            if next.is_empty() {
                return height;
            }
            height += 1;
            frontier = next;
        }
    }
}
