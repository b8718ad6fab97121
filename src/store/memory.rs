//! In-process stores, used by tests and by embedders without a database.

use crate::error::StoreError;
use crate::model::{Category, CategoryId, CategoryPatch};
use crate::store::{CategoryStore, DocumentStore};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|e| StoreError::Backend(format!("Failed to lock in-memory store: {e}")))
}

/// Category records kept in insertion order.
///
/// Enforces `(parent_id, slug)` uniqueness on every write, like the unique index of
/// the database store.
#[derive(Debug, Default)]
pub struct MemoryCategoryStore {
    records: Mutex<Vec<Category>>,
}

impl MemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store without any checks (e.g. to load corrupted fixtures).
    pub fn with_records(records: Vec<Category>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sibling_conflict(records: &[Category], candidate: &Category) -> Option<StoreError> {
    records
        .iter()
        .find(|c| {
            c.id != candidate.id && c.parent_id == candidate.parent_id && c.slug == candidate.slug
        })
        .map(|c| {
            StoreError::Conflict(format!(
                "slug '{}' already used by {} under the same parent",
                candidate.slug, c.id
            ))
        })
}

impl CategoryStore for MemoryCategoryStore {
    fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(lock(&self.records)?.clone())
    }

    fn insert(&self, record: Category) -> Result<Category, StoreError> {
        let mut records = lock(&self.records)?;
        if records.iter().any(|c| c.id == record.id) {
            return Err(StoreError::Conflict(format!("id {} already exists", record.id)));
        }
        if let Some(conflict) = sibling_conflict(&records, &record) {
            return Err(conflict);
        }
        records.push(record.clone());
        Ok(record)
    }

    fn update(&self, id: CategoryId, patch: &CategoryPatch) -> Result<Category, StoreError> {
        let mut records = lock(&self.records)?;
        let position = records
            .iter()
            .position(|c| c.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let mut updated = records[position].clone();
        updated.apply(patch);
        if let Some(conflict) = sibling_conflict(&records, &updated) {
            return Err(conflict);
        }
        records[position] = updated.clone();
        Ok(updated)
    }

    fn delete(&self, id: CategoryId) -> Result<(), StoreError> {
        let mut records = lock(&self.records)?;
        let before = records.len();
        records.retain(|c| c.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

/// Document-to-category assignments keyed by document id.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    assignments: Mutex<BTreeMap<String, Option<CategoryId>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// File (or re-file) document `document_id` under `category_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` when the store lock is poisoned.
    pub fn file_document(
        &self,
        document_id: impl Into<String>,
        category_id: Option<CategoryId>,
    ) -> Result<(), StoreError> {
        lock(&self.assignments)?.insert(document_id.into(), category_id);
        Ok(())
    }

    /// Current category of a document; `None` when the document is unknown.
    pub fn category_of(&self, document_id: &str) -> Option<Option<CategoryId>> {
        self.assignments
            .lock()
            .ok()
            .and_then(|a| a.get(document_id).copied())
    }

    /// Ids of documents with no category.
    pub fn uncategorized(&self) -> Vec<String> {
        self.assignments
            .lock()
            .map(|a| {
                a.iter()
                    .filter(|(_, category)| category.is_none())
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn count_documents_by_category(&self, category_id: CategoryId) -> Result<usize, StoreError> {
        Ok(lock(&self.assignments)?
            .values()
            .filter(|c| **c == Some(category_id))
            .count())
    }

    fn reassign_documents(
        &self,
        from: CategoryId,
        to: Option<CategoryId>,
    ) -> Result<usize, StoreError> {
        let mut moved = 0;
        for category in lock(&self.assignments)?.values_mut() {
            if *category == Some(from) {
                *category = to;
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn count_documents_for(
        &self,
        category_ids: &[CategoryId],
    ) -> Result<HashMap<CategoryId, usize>, StoreError> {
        let wanted: HashSet<&CategoryId> = category_ids.iter().collect();
        let assignments = lock(&self.assignments)?;
        let mut counts: HashMap<CategoryId, usize> = HashMap::new();
        for category in assignments.values().flatten() {
            if wanted.contains(category) {
                *counts.entry(*category).or_default() += 1;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::category;

    #[test]
    fn test_insert_and_list() {
        let store = MemoryCategoryStore::new();
        let root = category("Support", None);
        store.insert(root.clone()).expect("insert");
        assert_eq!(store.list_categories().unwrap(), vec![root]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_rejects_sibling_slug_conflict() {
        let store = MemoryCategoryStore::new();
        store.insert(category("Support", None)).unwrap();
        let err = store.insert(category("support", None)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Same slug under a different parent is fine
        let root = store.list_categories().unwrap()[0].clone();
        assert!(store.insert(category("Support", Some(root.id))).is_ok());
    }

    #[test]
    fn test_update_applies_patch_and_checks_conflicts() {
        let store = MemoryCategoryStore::new();
        let a = store.insert(category("Alpha", None)).unwrap();
        let b = store.insert(category("Beta", None)).unwrap();

        let updated = store
            .update(a.id, &CategoryPatch::new().name("Gamma").slug("gamma", false))
            .unwrap();
        assert_eq!(updated.slug, "gamma");
        assert!(updated.updated_at >= a.updated_at);

        let err = store
            .update(b.id, &CategoryPatch::new().slug("gamma", false))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_update_and_delete_missing() {
        let store = MemoryCategoryStore::new();
        let id = CategoryId::new();
        assert_eq!(
            store.update(id, &CategoryPatch::new().order(1)).unwrap_err(),
            StoreError::NotFound(id)
        );
        assert_eq!(store.delete(id).unwrap_err(), StoreError::NotFound(id));
    }

    #[test]
    fn test_document_counts_and_reassignment() {
        let docs = MemoryDocumentStore::new();
        let from = CategoryId::new();
        let to = CategoryId::new();
        docs.file_document("doc-1", Some(from)).unwrap();
        docs.file_document("doc-2", Some(from)).unwrap();
        docs.file_document("doc-3", Some(to)).unwrap();
        docs.file_document("doc-4", None).unwrap();

        assert_eq!(docs.count_documents_by_category(from).unwrap(), 2);
        let counts = docs.count_documents_for(&[from, to]).unwrap();
        assert_eq!(counts.get(&from), Some(&2));
        assert_eq!(counts.get(&to), Some(&1));

        assert_eq!(docs.reassign_documents(from, None).unwrap(), 2);
        assert_eq!(docs.count_documents_by_category(from).unwrap(), 0);
        assert_eq!(docs.category_of("doc-1"), Some(None));
        assert_eq!(docs.uncategorized().len(), 3);
    }

    #[test]
    fn test_counts_cover_only_requested_categories() {
        let docs = MemoryDocumentStore::new();
        let wanted = CategoryId::new();
        let other = CategoryId::new();
        for (doc, category) in [("a", wanted), ("b", other), ("c", wanted), ("d", other)] {
            docs.file_document(doc, Some(category)).unwrap();
        }

        let counts = docs.count_documents_for(&[wanted]).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get(&wanted), Some(&2));
        assert!(docs.count_documents_for(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_filing_into_poisoned_store_fails() {
        let docs = std::sync::Arc::new(MemoryDocumentStore::new());
        let poisoner = std::sync::Arc::clone(&docs);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.assignments.lock().unwrap();
            panic!("poison the assignments lock");
        })
        .join();

        let err = docs.file_document("doc-1", None).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
