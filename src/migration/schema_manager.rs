//! SchemaManager - schema operations available to migrations

use crate::executor::{DbError, Executor};
use may_postgres::types::ToSql;
use sea_query::{
    IndexCreateStatement, IndexDropStatement, PostgresQueryBuilder, TableCreateStatement,
    TableDropStatement,
};
use std::cell::RefCell;

/// Runs DDL on behalf of a [`Migration`](super::Migration)
///
/// A manager without an executor only records the statements it is given; the
/// migrator uses that mode to checksum a migration.
pub struct SchemaManager<'a> {
    executor: Option<&'a dyn Executor>,
    recorded: RefCell<Vec<String>>,
}

impl<'a> SchemaManager<'a> {
    pub fn new(executor: &'a dyn Executor) -> Self {
        Self {
            executor: Some(executor),
            recorded: RefCell::new(Vec::new()),
        }
    }

    /// A manager that records statements without executing them
    pub fn recording() -> SchemaManager<'static> {
        SchemaManager {
            executor: None,
            recorded: RefCell::new(Vec::new()),
        }
    }

    /// Statements issued so far, in order
    pub fn recorded(&self) -> Vec<String> {
        self.recorded.borrow().clone()
    }

    pub fn create_table(&self, table: TableCreateStatement) -> Result<(), DbError> {
        self.run(&table.build(PostgresQueryBuilder), &[])
    }

    pub fn drop_table(&self, table: TableDropStatement) -> Result<(), DbError> {
        self.run(&table.build(PostgresQueryBuilder), &[])
    }

    pub fn create_index(&self, index: IndexCreateStatement) -> Result<(), DbError> {
        self.run(&index.build(PostgresQueryBuilder), &[])
    }

    pub fn drop_index(&self, index: IndexDropStatement) -> Result<(), DbError> {
        self.run(&index.build(PostgresQueryBuilder), &[])
    }

    /// Execute raw SQL
    ///
    /// For DDL the query builder cannot express, such as expression indexes.
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<(), DbError> {
        self.run(sql, params)
    }

    fn run(&self, sql: &str, params: &[&dyn ToSql]) -> Result<(), DbError> {
        self.recorded.borrow_mut().push(sql.trim().to_string());
        match self.executor {
            Some(executor) => executor.execute(sql, params).map(|_| ()),
            None => Ok(()),
        }
    }
}
