//! # Docwiki
//!
//! Hierarchical categories for the docwiki document wiki: a permission-gated
//! orchestrator over flat category records, the tree and breadcrumb views built from
//! them, and PostgreSQL storage on the `may` runtime.
//!
//! ```
//! use docwiki::model::{Actor, NewCategory};
//! use docwiki::store::{MemoryCategoryStore, MemoryDocumentStore};
//! use docwiki::CategoryService;
//!
//! let service = CategoryService::new(MemoryCategoryStore::new(), MemoryDocumentStore::new());
//! let admin = Actor::administrator("admin");
//!
//! let support = service.create_category(&admin, NewCategory::new("Support"))?;
//! let systems = service.create_category(&admin, NewCategory::new("Internal Systems").under(support.id))?;
//!
//! assert_eq!(systems.slug, "internal-systems");
//! assert_eq!(service.get_breadcrumb(systems.id)?, "Support > Internal Systems");
//! # Ok::<(), docwiki::CategoryError>(())
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod index;
pub mod metrics;
pub mod migration;
pub mod model;
pub mod path;
pub mod permission;
pub mod raw_sql;
pub mod service;
pub mod slug;
pub mod store;
pub mod tree;
pub mod validator;

#[cfg(test)]
mod test_helpers;

pub use config::{CategoryConfig, DocwikiConfig};
pub use connection::{connect, ConnectionError};
pub use error::{Action, AncestryError, CategoryError, StoreError, ValidationError};
pub use executor::{DbError, Executor, PgExecutor};
pub use model::{Actor, Category, CategoryId, CategoryNode, DepartmentId, NewCategory, RenameCategory, Role};
pub use raw_sql::{execute_unprepared, query_value};
pub use service::{CategoryService, DeleteOutcome, DeletePolicy};
pub use store::{CategoryStore, DocumentStore};
