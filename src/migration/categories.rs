use super::{Migration, SchemaManager};
use crate::executor::DbError;
use crate::store::postgres::CATEGORIES_TABLE;
use sea_query::{ColumnDef, Expr, ForeignKey, ForeignKeyAction, Index, Table};

/// Sibling slugs are unique per parent; roots share the nil uuid so they collide too.
const SIBLING_SLUG_INDEX: &str = "uq_categories_parent_slug";

/// The `categories` table and its indexes.
pub struct CreateCategoriesTable;

impl Migration for CreateCategoriesTable {
    fn name(&self) -> &str {
        "create_categories_table"
    }

    fn version(&self) -> i64 {
        20240301090000
    }

    fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        manager.create_table(
            Table::create()
                .table(CATEGORIES_TABLE)
                .if_not_exists()
                .col(ColumnDef::new("id").uuid().not_null().primary_key())
                .col(ColumnDef::new("name").text().not_null())
                .col(ColumnDef::new("slug").text().not_null())
                .col(ColumnDef::new("slug_pinned").boolean().not_null().default(false))
                .col(ColumnDef::new("parent_id").uuid().null())
                .col(ColumnDef::new("department_id").text().null())
                .col(ColumnDef::new("sort_order").integer().not_null().default(0))
                .col(ColumnDef::new("icon").text().null())
                .col(ColumnDef::new("description").text().null())
                .col(ColumnDef::new("created_at").timestamp_with_time_zone().not_null())
                .col(ColumnDef::new("updated_at").timestamp_with_time_zone().not_null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_categories_parent")
                        .from(CATEGORIES_TABLE, "parent_id")
                        .to(CATEGORIES_TABLE, "id")
                        .on_delete(ForeignKeyAction::Restrict),
                )
                .to_owned(),
        )?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_categories_parent")
                .table(CATEGORIES_TABLE)
                .col(Expr::col("parent_id"))
                .to_owned(),
        )?;

        manager.execute(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {SIBLING_SLUG_INDEX} ON {CATEGORIES_TABLE} \
                 (COALESCE(parent_id, '00000000-0000-0000-0000-000000000000'::uuid), slug)"
            ),
            &[],
        )
    }

    fn down(&self, manager: &SchemaManager<'_>) -> Result<(), DbError> {
        manager.drop_table(Table::drop().table(CATEGORIES_TABLE).if_exists().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_emits_table_and_indexes() {
        let manager = SchemaManager::recording();
        CreateCategoriesTable.up(&manager).unwrap();
        let statements = manager.recorded();

        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("CREATE TABLE IF NOT EXISTS \"categories\""));
        assert!(statements[0].contains("\"sort_order\""));
        assert!(statements[0].contains("REFERENCES"));
        assert!(statements[1].contains("idx_categories_parent"));
        assert!(statements[2].contains("CREATE UNIQUE INDEX"));
        assert!(statements[2].contains("COALESCE(parent_id"));
    }

    #[test]
    fn test_down_drops_table() {
        let manager = SchemaManager::recording();
        CreateCategoriesTable.down(&manager).unwrap();
        assert_eq!(manager.recorded(), vec!["DROP TABLE IF EXISTS \"categories\"".to_string()]);
    }
}
