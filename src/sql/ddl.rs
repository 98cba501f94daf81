//! DROP and CREATE statements rendered from the table catalogue.

use itertools::Itertools;

use super::{Column, Constraint, Statement, StatementKind, Table};
use crate::config::Dialect;

pub fn drop_table(table: Table) -> Statement {
    Statement::new(
        table,
        StatementKind::Drop,
        format!("DROP TABLE IF EXISTS {}", table.name()),
    )
}

pub fn create_table(table: Table, dialect: Dialect) -> Statement {
    let columns = table
        .columns()
        .iter()
        .map(|column| format!("    {}", column_definition(column, dialect)))
        .join(",\n");
    Statement::new(
        table,
        StatementKind::Create,
        format!("CREATE TABLE IF NOT EXISTS {} (\n{}\n)", table.name(), columns),
    )
}

fn column_definition(column: &Column, dialect: Dialect) -> String {
    let ty = column.sql_type.as_sql();
    match column.constraint {
        Constraint::Nullable => format!("{} {}", column.name, ty),
        Constraint::NotNull => format!("{} {} NOT NULL", column.name, ty),
        Constraint::PrimaryKey => format!("{} {} PRIMARY KEY", column.name, ty),
        Constraint::IdentityPrimaryKey => match dialect {
            Dialect::Redshift => format!("{} {} IDENTITY(0,1) PRIMARY KEY", column.name, ty),
            Dialect::Postgres => format!(
                "{} {} GENERATED BY DEFAULT AS IDENTITY (START WITH 0 MINVALUE 0) PRIMARY KEY",
                column.name, ty
            ),
        },
    }
}
