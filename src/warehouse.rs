//! The narrow surface the pipeline needs from a warehouse connection.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::report::StepReport;
use crate::sql::{Statement, Table};

/// A single warehouse session. Calls are strictly sequential; each returns
/// only once the warehouse has finished the statement.
#[async_trait]
pub trait Warehouse: Send {
    /// Run one statement over the simple query protocol; returns rows affected.
    async fn execute(&mut self, sql: &str) -> Result<u64, sqlx::Error>;

    /// Insert text-encoded rows into `table`, one value per catalogue column.
    /// Values are cast to the column type by the warehouse.
    async fn insert_rows(
        &mut self,
        table: Table,
        rows: &[Vec<Option<String>>],
    ) -> Result<u64, sqlx::Error>;

    async fn count_rows(&mut self, table: Table) -> Result<i64, sqlx::Error>;
}

/// Execute `statement` and time it.
pub(crate) async fn run_statement<W>(
    warehouse: &mut W,
    statement: &Statement,
) -> Result<StepReport, sqlx::Error>
where
    W: Warehouse + ?Sized,
{
    debug!(table = %statement.table, kind = %statement.kind, sql = %statement.sql, "executing");
    let started = Instant::now();
    let rows = warehouse.execute(&statement.sql).await?;
    let elapsed = started.elapsed();
    info!(
        table = %statement.table,
        kind = %statement.kind,
        rows,
        elapsed_ms = elapsed.as_millis() as u64,
        "statement completed"
    );
    Ok(StepReport {
        table: statement.table,
        kind: statement.kind,
        rows,
        elapsed,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    /// In-memory warehouse that records every call and can be told to fail.
    #[derive(Debug, Default)]
    pub struct RecordingWarehouse {
        pub executed: Vec<String>,
        pub inserted: Vec<(Table, usize)>,
        pub counts: HashMap<Table, i64>,
        /// Fail the first `execute` whose SQL contains this text.
        pub fail_when: Option<String>,
        /// Rows reported for every successful `execute`.
        pub rows_per_statement: u64,
    }

    impl RecordingWarehouse {
        pub fn failing_on(needle: &str) -> Self {
            Self {
                fail_when: Some(needle.to_string()),
                ..Self::default()
            }
        }

        /// First line of every executed statement, for compact assertions.
        pub fn heads(&self) -> Vec<String> {
            self.executed
                .iter()
                .map(|sql| sql.lines().next().unwrap_or_default().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl Warehouse for RecordingWarehouse {
        async fn execute(&mut self, sql: &str) -> Result<u64, sqlx::Error> {
            if let Some(needle) = &self.fail_when {
                if sql.contains(needle.as_str()) {
                    return Err(sqlx::Error::Protocol(format!("injected failure on {needle}")));
                }
            }
            self.executed.push(sql.to_string());
            Ok(self.rows_per_statement)
        }

        async fn insert_rows(
            &mut self,
            table: Table,
            rows: &[Vec<Option<String>>],
        ) -> Result<u64, sqlx::Error> {
            if let Some(bad) = rows.iter().find(|r| r.len() != table.columns().len()) {
                return Err(sqlx::Error::Protocol(format!(
                    "row width {} does not match {}",
                    bad.len(),
                    table
                )));
            }
            self.inserted.push((table, rows.len()));
            *self.counts.entry(table).or_default() += rows.len() as i64;
            Ok(rows.len() as u64)
        }

        async fn count_rows(&mut self, table: Table) -> Result<i64, sqlx::Error> {
            Ok(self.counts.get(&table).copied().unwrap_or_default())
        }
    }
}
