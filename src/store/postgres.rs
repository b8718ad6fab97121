//! PostgreSQL-backed stores.
//!
//! Category rows live in the `categories` table created by
//! [`crate::migration::CreateCategoriesTable`]. Sibling slug uniqueness is enforced by a
//! unique index, so a racing writer surfaces as SQLSTATE `23505` and is reported as
//! `StoreError::Conflict`.

use crate::config::DocumentTableConfig;
use crate::error::StoreError;
use crate::executor::{DbError, Executor};
use crate::model::{Category, CategoryId, CategoryPatch, DepartmentId};
use crate::raw_sql::query_value;
use chrono::{DateTime, Utc};
use may_postgres::types::ToSql;
use may_postgres::Row;
use sea_query::{Order, PostgresQueryBuilder, Query};
use std::collections::HashMap;
use uuid::Uuid;

pub const CATEGORIES_TABLE: &str = "categories";

const COLUMNS: [&str; 11] = [
    "id",
    "name",
    "slug",
    "slug_pinned",
    "parent_id",
    "department_id",
    "sort_order",
    "icon",
    "description",
    "created_at",
    "updated_at",
];

/// SQLSTATE codes that mean "another writer got there first; re-read and retry".
const CONFLICT_STATES: [&str; 4] = [
    "23505", // unique_violation
    "23503", // foreign_key_violation (parent removed concurrently, or children added)
    "40001", // serialization_failure
    "40P01", // deadlock_detected
];

fn store_error(err: DbError) -> StoreError {
    match err.sql_state() {
        Some(state) if CONFLICT_STATES.contains(&state) => StoreError::Conflict(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

fn column_list() -> String {
    COLUMNS.join(", ")
}

fn row_to_category(row: &Row) -> Result<Category, StoreError> {
    fn get<'a, T: may_postgres::types::FromSql<'a>>(
        row: &'a Row,
        column: &str,
    ) -> Result<T, StoreError> {
        row.try_get::<&str, T>(column)
            .map_err(|e| StoreError::Backend(format!("Failed to decode column {column}: {e}")))
    }

    Ok(Category {
        id: CategoryId::from_uuid(get::<Uuid>(row, "id")?),
        name: get(row, "name")?,
        slug: get(row, "slug")?,
        slug_pinned: get(row, "slug_pinned")?,
        parent_id: get::<Option<Uuid>>(row, "parent_id")?.map(CategoryId::from_uuid),
        department_id: get::<Option<String>>(row, "department_id")?
            .as_deref()
            .and_then(DepartmentId::parse),
        order: get(row, "sort_order")?,
        icon: get(row, "icon")?,
        description: get(row, "description")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(row, "updated_at")?,
    })
}

/// Category store over any [`Executor`].
pub struct PgCategoryStore<E: Executor> {
    executor: E,
}

impl<E: Executor> PgCategoryStore<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn select_sql() -> String {
        Query::select()
            .columns(COLUMNS)
            .from(CATEGORIES_TABLE)
            .order_by("created_at", Order::Asc)
            .to_string(PostgresQueryBuilder)
    }

    fn find(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            column_list(),
            CATEGORIES_TABLE
        );
        self.executor
            .query_opt(&sql, &[id.as_uuid()])
            .map_err(store_error)?
            .as_ref()
            .map(row_to_category)
            .transpose()
    }

    fn write_row(&self, sql: &str, record: &Category) -> Result<Category, StoreError> {
        let parent = record.parent_id.map(|p| *p.as_uuid());
        let department = record.department_id.as_ref().map(|d| d.as_str().to_string());
        let params: [&dyn ToSql; 11] = [
            record.id.as_uuid(),
            &record.name,
            &record.slug,
            &record.slug_pinned,
            &parent,
            &department,
            &record.order,
            &record.icon,
            &record.description,
            &record.created_at,
            &record.updated_at,
        ];
        let row = self.executor.query_one(sql, &params).map_err(store_error)?;
        row_to_category(&row)
    }
}

impl<E: Executor> crate::store::CategoryStore for PgCategoryStore<E> {
    fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.executor
            .query_all(&Self::select_sql(), &[])
            .map_err(store_error)?
            .iter()
            .map(row_to_category)
            .collect()
    }

    fn insert(&self, record: Category) -> Result<Category, StoreError> {
        let placeholders: Vec<String> = (1..=COLUMNS.len()).map(|i| format!("${i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            CATEGORIES_TABLE,
            column_list(),
            placeholders.join(", "),
            column_list()
        );
        self.write_row(&sql, &record)
    }

    fn update(&self, id: CategoryId, patch: &CategoryPatch) -> Result<Category, StoreError> {
        let mut record = self.find(id)?.ok_or(StoreError::NotFound(id))?;
        record.apply(patch);

        // $1 is the id; every other column is rewritten from the patched record
        let assignments: Vec<String> = COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, column)| format!("{column} = ${}", i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = $1 RETURNING {}",
            CATEGORIES_TABLE,
            assignments.join(", "),
            column_list()
        );
        match self.write_row(&sql, &record) {
            // Row vanished between read and write
            Err(StoreError::Backend(msg)) if self.find(id)?.is_none() => {
                log::debug!("Update of {} lost a race with delete: {}", id, msg);
                Err(StoreError::NotFound(id))
            }
            other => other,
        }
    }

    fn delete(&self, id: CategoryId) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", CATEGORIES_TABLE);
        let affected = self
            .executor
            .execute(&sql, &[id.as_uuid()])
            .map_err(store_error)?;
        if affected == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Document collaborator over a table holding a nullable category column.
pub struct PgDocumentStore<E: Executor> {
    executor: E,
    table: String,
    column: String,
}

impl<E: Executor> PgDocumentStore<E> {
    /// # Errors
    ///
    /// Returns `StoreError::Backend` when the configured table or column is not a plain
    /// SQL identifier.
    pub fn new(executor: E, config: &DocumentTableConfig) -> Result<Self, StoreError> {
        for name in [&config.table, &config.category_column] {
            if !is_identifier(name) {
                return Err(StoreError::Backend(format!(
                    "'{name}' is not a valid SQL identifier"
                )));
            }
        }
        Ok(Self {
            executor,
            table: config.table.clone(),
            column: config.category_column.clone(),
        })
    }
}

impl<E: Executor> crate::store::DocumentStore for PgDocumentStore<E> {
    fn count_documents_by_category(&self, category_id: CategoryId) -> Result<usize, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM \"{}\" WHERE \"{}\" = $1",
            self.table, self.column
        );
        let count: i64 =
            query_value(&self.executor, &sql, &[category_id.as_uuid()]).map_err(store_error)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn reassign_documents(
        &self,
        from: CategoryId,
        to: Option<CategoryId>,
    ) -> Result<usize, StoreError> {
        let sql = format!(
            "UPDATE \"{}\" SET \"{}\" = $2 WHERE \"{}\" = $1",
            self.table, self.column, self.column
        );
        let target: Option<Uuid> = to.map(|t| *t.as_uuid());
        let moved = self
            .executor
            .execute(&sql, &[from.as_uuid(), &target])
            .map_err(store_error)?;
        Ok(usize::try_from(moved).unwrap_or(usize::MAX))
    }

    fn count_documents_for(
        &self,
        category_ids: &[CategoryId],
    ) -> Result<HashMap<CategoryId, usize>, StoreError> {
        if category_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT \"{col}\", COUNT(*) FROM \"{table}\" WHERE \"{col}\" = ANY($1) GROUP BY \"{col}\"",
            col = self.column,
            table = self.table
        );
        let ids: Vec<Uuid> = category_ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = self.executor.query_all(&sql, &[&ids]).map_err(store_error)?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row
                .try_get(0)
                .map_err(|e| StoreError::Backend(format!("Failed to decode category id: {e}")))?;
            let count: i64 = row
                .try_get(1)
                .map_err(|e| StoreError::Backend(format!("Failed to decode count: {e}")))?;
            counts.insert(CategoryId::from_uuid(id), usize::try_from(count).unwrap_or(0));
        }
        Ok(counts)
    }
}
