//! Compare the live warehouse columns with the table catalogue.

use std::fmt::Write as _;

use sqlx::{PgConnection, Row};

use crate::error::{EtlError, EtlResult};
use crate::sql::{SqlType, Table};

/// One row of `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    MissingTable,
    MissingColumn(&'static str),
    UnexpectedColumn(String),
    Nullability {
        column: &'static str,
        expected_nullable: bool,
    },
    Type {
        column: &'static str,
        expected: &'static str,
        found: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAudit {
    pub table: Table,
    pub findings: Vec<Finding>,
}

impl TableAudit {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Catalogue vs live columns. Names compare case-insensitively because
/// Redshift folds unquoted identifiers to lower case.
pub fn compare_columns(table: Table, live: &[LiveColumn]) -> TableAudit {
    if live.is_empty() {
        return TableAudit {
            table,
            findings: vec![Finding::MissingTable],
        };
    }

    let mut findings = Vec::new();
    for column in table.columns() {
        match live.iter().find(|l| l.name.eq_ignore_ascii_case(column.name)) {
            None => findings.push(Finding::MissingColumn(column.name)),
            Some(l) if l.nullable != column.is_nullable() => findings.push(Finding::Nullability {
                column: column.name,
                expected_nullable: column.is_nullable(),
            }),
            Some(l) if !l.data_type.eq_ignore_ascii_case(catalog_type(column.sql_type)) => {
                findings.push(Finding::Type {
                    column: column.name,
                    expected: catalog_type(column.sql_type),
                    found: l.data_type.clone(),
                })
            }
            Some(_) => {}
        }
    }
    for l in live {
        if !table
            .columns()
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&l.name))
        {
            findings.push(Finding::UnexpectedColumn(l.name.clone()));
        }
    }
    TableAudit { table, findings }
}

/// `information_schema.columns.data_type` as reported for each column type.
fn catalog_type(sql_type: SqlType) -> &'static str {
    match sql_type {
        SqlType::Varchar => "character varying",
        SqlType::Char => "character",
        SqlType::Int => "integer",
        SqlType::BigInt => "bigint",
        SqlType::Numeric => "numeric",
        SqlType::Timestamp => "timestamp without time zone",
    }
}

async fn live_columns(conn: &mut PgConnection, table: Table) -> Result<Vec<LiveColumn>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT column_name::text, data_type::text, is_nullable::text \
         FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 \
         ORDER BY ordinal_position",
    )
    .bind(table.name())
    .persistent(false)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| -> Result<LiveColumn, sqlx::Error> {
            Ok(LiveColumn {
                name: row.try_get(0)?,
                data_type: row.try_get(1)?,
                nullable: row.try_get::<String, _>(2)? == "YES",
            })
        })
        .collect()
}

pub async fn audit_schema(conn: &mut PgConnection) -> EtlResult<Vec<TableAudit>> {
    let mut audits = Vec::with_capacity(Table::ALL.len());
    for table in Table::ALL {
        let live = live_columns(conn, table).await.map_err(EtlError::Connect)?;
        audits.push(compare_columns(table, &live));
    }
    Ok(audits)
}

pub fn render_audit(audits: &[TableAudit]) -> String {
    let mut out = String::new();
    for audit in audits {
        writeln!(out, "=== {} ===", audit.table).ok();
        if audit.is_clean() {
            writeln!(out, "  ok ({} columns)", audit.table.columns().len()).ok();
        }
        for finding in &audit.findings {
            let line = match finding {
                Finding::MissingTable => "missing: not present in schema".to_string(),
                Finding::MissingColumn(c) => format!("missing column {c}"),
                Finding::UnexpectedColumn(c) => format!("unexpected column {c}"),
                Finding::Nullability {
                    column,
                    expected_nullable,
                } => format!(
                    "column {column} should be {}",
                    if *expected_nullable { "nullable" } else { "NOT NULL" }
                ),
                Finding::Type {
                    column,
                    expected,
                    found,
                } => format!("column {column} is {found}, expected {expected}"),
            };
            writeln!(out, "  {line}").ok();
        }
    }
    out
}
