//! Storage contracts consumed by the category service.
//!
//! Both contracts are atomic per record only. The service never relies on
//! cross-record transactions; it orders its writes so that no document ever points at
//! a removed category.

pub mod memory;
pub mod postgres;

use crate::error::StoreError;
use crate::model::{Category, CategoryId, CategoryPatch};
use std::collections::HashMap;

pub use memory::{MemoryCategoryStore, MemoryDocumentStore};
pub use postgres::{PgCategoryStore, PgDocumentStore};

/// CRUD over flat category records.
///
/// Implementations are the arbiter of write ordering: a write that would give two
/// siblings the same slug must fail with `StoreError::Conflict`, even when the
/// service's own check passed against an older snapshot.
pub trait CategoryStore {
    /// Every record, in no particular order.
    fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    /// Persist a new record and return it as stored.
    fn insert(&self, record: Category) -> Result<Category, StoreError>;

    /// Apply `patch` to record `id` and return the updated record.
    fn update(&self, id: CategoryId, patch: &CategoryPatch) -> Result<Category, StoreError>;

    /// Remove record `id`.
    fn delete(&self, id: CategoryId) -> Result<(), StoreError>;
}

/// The slice of the document collaborator the category service needs.
pub trait DocumentStore {
    /// Documents filed directly under `category_id`.
    fn count_documents_by_category(&self, category_id: CategoryId) -> Result<usize, StoreError>;

    /// Move every document of `from` to `to` (`None` leaves them uncategorized).
    /// Returns the number of documents moved.
    fn reassign_documents(
        &self,
        from: CategoryId,
        to: Option<CategoryId>,
    ) -> Result<usize, StoreError>;

    /// Counts for many categories at once. Ids without documents may be omitted.
    ///
    /// The default issues one count per id; backends with a cheaper bulk query
    /// should override it.
    fn count_documents_for(
        &self,
        category_ids: &[CategoryId],
    ) -> Result<HashMap<CategoryId, usize>, StoreError> {
        let mut counts = HashMap::with_capacity(category_ids.len());
        for id in category_ids {
            let count = self.count_documents_by_category(*id)?;
            if count > 0 {
                counts.insert(*id, count);
            }
        }
        Ok(counts)
    }
}

impl<S: CategoryStore + ?Sized> CategoryStore for &S {
    fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        (**self).list_categories()
    }

    fn insert(&self, record: Category) -> Result<Category, StoreError> {
        (**self).insert(record)
    }

    fn update(&self, id: CategoryId, patch: &CategoryPatch) -> Result<Category, StoreError> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: CategoryId) -> Result<(), StoreError> {
        (**self).delete(id)
    }
}

impl<D: DocumentStore + ?Sized> DocumentStore for &D {
    fn count_documents_by_category(&self, category_id: CategoryId) -> Result<usize, StoreError> {
        (**self).count_documents_by_category(category_id)
    }

    fn reassign_documents(
        &self,
        from: CategoryId,
        to: Option<CategoryId>,
    ) -> Result<usize, StoreError> {
        (**self).reassign_documents(from, to)
    }

    fn count_documents_for(
        &self,
        category_ids: &[CategoryId],
    ) -> Result<HashMap<CategoryId, usize>, StoreError> {
        (**self).count_documents_for(category_ids)
    }
}
