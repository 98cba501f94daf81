//! Drop and create the seven warehouse tables.

use tracing::{info, instrument};

use crate::config::Dialect;
use crate::error::{EtlError, EtlResult};
use crate::report::LoadReport;
use crate::sql::ddl::{create_table, drop_table};
use crate::sql::{Statement, Table};
use crate::warehouse::{run_statement, Warehouse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaManager {
    dialect: Dialect,
}

impl SchemaManager {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// `DROP TABLE IF EXISTS` for every table, staging first.
    pub fn drop_statements(&self) -> Vec<Statement> {
        Table::ALL.iter().copied().map(drop_table).collect()
    }

    /// `CREATE TABLE IF NOT EXISTS` for every table, staging first.
    pub fn create_statements(&self) -> Vec<Statement> {
        Table::ALL
            .iter()
            .map(|&table| create_table(table, self.dialect))
            .collect()
    }

    #[instrument(skip_all, fields(dialect = %self.dialect))]
    pub async fn drop_tables<W>(&self, warehouse: &mut W) -> EtlResult<LoadReport>
    where
        W: Warehouse + ?Sized,
    {
        execute_all(warehouse, &self.drop_statements()).await
    }

    #[instrument(skip_all, fields(dialect = %self.dialect))]
    pub async fn create_tables<W>(&self, warehouse: &mut W) -> EtlResult<LoadReport>
    where
        W: Warehouse + ?Sized,
    {
        execute_all(warehouse, &self.create_statements()).await
    }

    /// Drop everything, then create everything.
    pub async fn recreate<W>(&self, warehouse: &mut W) -> EtlResult<LoadReport>
    where
        W: Warehouse + ?Sized,
    {
        let mut report = self.drop_tables(warehouse).await?;
        report.extend(self.create_tables(warehouse).await?);
        info!(tables = Table::ALL.len(), "schema recreated");
        Ok(report)
    }
}

async fn execute_all<W>(warehouse: &mut W, statements: &[Statement]) -> EtlResult<LoadReport>
where
    W: Warehouse + ?Sized,
{
    let mut report = LoadReport::default();
    for statement in statements {
        let done = run_statement(warehouse, statement)
            .await
            .map_err(|source| EtlError::Schema {
                table: statement.table,
                kind: statement.kind,
                source,
            })?;
        report.push(done);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sql::StatementKind;
    use crate::warehouse::testing::RecordingWarehouse;

    #[tokio::test]
    async fn drop_and_create_are_repeatable() {
        let schema = SchemaManager::new(Dialect::Redshift);
        let mut wh = RecordingWarehouse::default();
        schema.recreate(&mut wh).await.unwrap();
        schema.recreate(&mut wh).await.unwrap();

        let heads = wh.heads();
        assert_eq!(heads.len(), 28);
        assert_eq!(heads[..14], heads[14..]);
        assert_eq!(heads[0], "DROP TABLE IF EXISTS staging_events");
        assert_eq!(heads[6], "DROP TABLE IF EXISTS time");
        assert_eq!(heads[7], "CREATE TABLE IF NOT EXISTS staging_events (");
        assert!(heads[..7].iter().all(|h| h.starts_with("DROP")));
        assert!(heads[7..14].iter().all(|h| h.starts_with("CREATE")));
    }

    #[tokio::test]
    async fn first_failure_stops_remaining_statements() {
        let schema = SchemaManager::new(Dialect::Redshift);
        let mut wh = RecordingWarehouse::failing_on("CREATE TABLE IF NOT EXISTS users");
        let err = schema.create_tables(&mut wh).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.table(), Some(Table::Users));
        assert!(matches!(
            err,
            EtlError::Schema {
                kind: StatementKind::Create,
                ..
            }
        ));
        // staging_events, staging_songs and songplays were created first.
        assert_eq!(wh.executed.len(), 3);
    }

    #[test]
    fn identity_syntax_follows_dialect() {
        let redshift = SchemaManager::new(Dialect::Redshift).create_statements();
        let postgres = SchemaManager::new(Dialect::Postgres).create_statements();
        let songplays = |stmts: &[Statement]| {
            stmts
                .iter()
                .find(|s| s.table == Table::Songplays)
                .map(|s| s.sql.clone())
                .unwrap()
        };
        assert!(songplays(&redshift).contains("IDENTITY(0,1)"));
        assert!(songplays(&postgres).contains("GENERATED BY DEFAULT AS IDENTITY"));
    }
}
