//! Materializes the flat category records into a sorted forest.
//!
//! The builder never drops a record:
//! - a `parent_id` that does not resolve (or points at the record itself) demotes the
//!   record to a root;
//! - records whose ancestor chain loops without reaching a root are cut out of the
//!   loop by promoting one of them (lowest id first) to a root.
//!
//! Siblings are ordered by `order`, then case-insensitive name, then id.

use crate::model::{Category, CategoryId, CategoryNode};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Direct document count per category id. Missing ids count as zero.
pub type DocumentCounts = HashMap<CategoryId, usize>;

/// Sibling ordering: `(order, lowercase name)`, then exact name and id so the result
/// is total and stable across runs.
pub fn compare_siblings(a: &Category, b: &Category) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Builds [`CategoryNode`] forests from a snapshot of flat records.
///
/// Holds only borrowed, read-only inputs; independent builds can run in parallel over
/// the same snapshot.
pub struct TreeBuilder<'a> {
    records: &'a [Category],
    counts: &'a DocumentCounts,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(records: &'a [Category], counts: &'a DocumentCounts) -> Self {
        Self { records, counts }
    }

    /// Build the sorted forest. O(n) grouping plus O(n log n) sorting.
    pub fn build(&self) -> Vec<CategoryNode> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::tree_build_span(self.records.len()).entered();

        let start = Instant::now();
        let parents = self.effective_parents();

        let mut groups: HashMap<Option<CategoryId>, Vec<&'a Category>> = HashMap::new();
        for record in self.records {
            let parent = parents.get(&record.id).copied().flatten();
            groups.entry(parent).or_default().push(record);
        }
        for siblings in groups.values_mut() {
            siblings.sort_by(|a, b| compare_siblings(a, b));
        }

        let roots = groups.get(&None).cloned().unwrap_or_default();
        let forest: Vec<CategoryNode> = roots
            .into_iter()
            .map(|root| self.materialize(root, &groups))
            .collect();

        let elapsed = start.elapsed();
        log::debug!(
            "Built category tree: {} records, {} roots in {:?}",
            self.records.len(),
            forest.len(),
            elapsed
        );
        #[cfg(feature = "metrics")]
        METRICS.record_tree_build(elapsed, self.records.len());

        forest
    }

    fn materialize(
        &self,
        record: &Category,
        groups: &HashMap<Option<CategoryId>, Vec<&'a Category>>,
    ) -> CategoryNode {
        let children = groups
            .get(&Some(record.id))
            .map(|kids| {
                kids.iter()
                    .map(|child| self.materialize(child, groups))
                    .collect()
            })
            .unwrap_or_default();
        CategoryNode {
            category: record.clone(),
            doc_count: self.counts.get(&record.id).copied().unwrap_or(0),
            children,
        }
    }

    /// Parent of every record in the materialized view, after demotions and cycle cuts.
    fn effective_parents(&self) -> HashMap<CategoryId, Option<CategoryId>> {
        let known: HashSet<CategoryId> = self.records.iter().map(|r| r.id).collect();
        let mut parents: HashMap<CategoryId, Option<CategoryId>> =
            HashMap::with_capacity(self.records.len());

        for record in self.records {
            let parent = match record.parent_id {
                Some(parent) if parent != record.id && known.contains(&parent) => Some(parent),
                Some(parent) => {
                    log::warn!(
                        "Category {} ('{}') references missing parent {}; shown as a root",
                        record.id,
                        record.name,
                        parent
                    );
                    None
                }
                None => None,
            };
            parents.insert(record.id, parent);
        }

        let mut children: HashMap<CategoryId, Vec<CategoryId>> = HashMap::new();
        for (id, parent) in &parents {
            if let Some(parent) = parent {
                children.entry(*parent).or_default().push(*id);
            }
        }

        let mut reached: HashSet<CategoryId> = HashSet::with_capacity(parents.len());
        let roots: Vec<CategoryId> = parents
            .iter()
            .filter(|(_, parent)| parent.is_none())
            .map(|(id, _)| *id)
            .collect();
        mark_reachable(roots, &children, &mut reached);

        // Whatever is left sits on a loop or hangs below one
        let mut stranded: BTreeSet<CategoryId> = parents
            .keys()
            .filter(|id| !reached.contains(id))
            .copied()
            .collect();
        while let Some(id) = stranded.pop_first() {
            if reached.contains(&id) {
                continue;
            }
            let cut = cycle_entry(id, &parents);
            log::warn!(
                "Category {} is part of a parent cycle; shown as a root",
                cut
            );
            parents.insert(cut, None);
            mark_reachable(vec![cut], &children, &mut reached);
            if cut != id {
                stranded.insert(id);
            }
        }

        parents
    }
}

/// Lowest id on the loop that `start`'s ancestor chain runs into.
fn cycle_entry(start: CategoryId, parents: &HashMap<CategoryId, Option<CategoryId>>) -> CategoryId {
    let mut trail: Vec<CategoryId> = Vec::new();
    let mut cursor = Some(start);
    while let Some(id) = cursor {
        if let Some(pos) = trail.iter().position(|seen| *seen == id) {
            return trail[pos..].iter().copied().min().unwrap_or(id);
        }
        trail.push(id);
        cursor = parents.get(&id).copied().flatten();
    }
    // Chain reached a root after all; cut where it started
    start
}

fn mark_reachable(
    start: Vec<CategoryId>,
    children: &HashMap<CategoryId, Vec<CategoryId>>,
    reached: &mut HashSet<CategoryId>,
) {
    let mut queue: VecDeque<CategoryId> = start.into_iter().collect();
    while let Some(id) = queue.pop_front() {
        if !reached.insert(id) {
            continue;
        }
        if let Some(kids) = children.get(&id) {
            queue.extend(kids.iter().copied().filter(|k| !reached.contains(k)));
        }
    }
}

/// Build a forest; shorthand for `TreeBuilder::new(records, counts).build()`.
pub fn build(records: &[Category], counts: &DocumentCounts) -> Vec<CategoryNode> {
    TreeBuilder::new(records, counts).build()
}

/// Pre-order flattening of a forest back into flat records.
pub fn flatten(forest: &[CategoryNode]) -> Vec<Category> {
    let mut out = Vec::new();
    walk(forest, 0, &mut |node: &CategoryNode, _depth: usize| {
        out.push(node.category.clone())
    });
    out
}

/// Visit every node in display order with its depth.
pub fn walk<F>(forest: &[CategoryNode], depth: usize, visit: &mut F)
where
    F: FnMut(&CategoryNode, usize),
{
    for node in forest {
        visit(node, depth);
        walk(&node.children, depth + 1, visit);
    }
}

/// One row of the category selector shown when filing a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickerOption {
    pub id: CategoryId,
    pub name: String,
    pub depth: usize,
    /// Full breadcrumb, to tell same-named categories apart
    pub path: String,
}

impl PickerOption {
    /// Name indented by two spaces per level.
    pub fn label(&self) -> String {
        format!("{}{}", "  ".repeat(self.depth), self.name)
    }
}

/// Flatten a forest into selector rows in display order.
pub fn picker_options(forest: &[CategoryNode], separator: &str) -> Vec<PickerOption> {
    let mut out = Vec::new();
    let mut trail: Vec<String> = Vec::new();
    walk(forest, 0, &mut |node: &CategoryNode, depth: usize| {
        trail.truncate(depth);
        trail.push(node.category.name.clone());
        out.push(PickerOption {
            id: node.category.id,
            name: node.category.name.clone(),
            depth,
            path: trail.join(separator),
        });
    });
    out
}
