use async_trait::async_trait;
use itertools::Itertools;
use sqlx::{
    postgres::{PgConnectOptions, PgSslMode},
    ConnectOptions, Connection, Executor, PgConnection, Postgres, QueryBuilder,
};
use std::str::FromStr;
use tracing::{info, instrument};

use crate::config::ConnectionConfig;
use crate::error::{EtlError, EtlResult};
use crate::sql::Table;
use crate::warehouse::Warehouse;

/// Postgres protocol binds at most 65535 parameters per statement; the widest
/// staging table has 18 columns.
pub const INSERT_BATCH_ROWS: usize = 500;

/// One dedicated warehouse session for the whole run (no pool).
pub struct PgWarehouse {
    conn: PgConnection,
}

impl PgWarehouse {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(connection), fields(dsn = %connection.redacted()))]
    pub async fn connect(connection: &ConnectionConfig) -> EtlResult<Self> {
        let url = connection.url();
        // Redshift and PgBouncer-style proxies both dislike named prepared statements.
        let mut connect_options = PgConnectOptions::from_str(url)
            .map_err(EtlError::Connect)?
            .statement_cache_capacity(0)
            .application_name(env!("CARGO_PKG_NAME"));

        // Ensure TLS is enabled when DSN contains sslmode=require
        if url.contains("sslmode=require") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        let conn = connect_options
            .connect()
            .await
            .map_err(EtlError::Connect)?;
        info!("connected to warehouse");
        Ok(Self { conn })
    }

    /// Raw access for catalogue queries that are not part of the pipeline.
    pub fn connection_mut(&mut self) -> &mut PgConnection {
        &mut self.conn
    }

    pub async fn close(self) -> EtlResult<()> {
        self.conn.close().await.map_err(EtlError::Connect)
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn execute(&mut self, sql: &str) -> Result<u64, sqlx::Error> {
        // A bare &str carries no arguments, so it goes over the simple query
        // protocol without a prepare round-trip.
        let done = Executor::execute(&mut self.conn, sql).await?;
        Ok(done.rows_affected())
    }

    async fn insert_rows(
        &mut self,
        table: Table,
        rows: &[Vec<Option<String>>],
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }
        let columns = table.columns();
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} (", table.name()));
        builder.push(columns.iter().map(|c| c.name).join(", "));
        builder.push(") ");
        builder.push_values(rows, |mut b, row| {
            for (column, value) in columns.iter().zip(row) {
                b.push_bind(value.clone())
                    .push_unseparated(format!("::{}", column.sql_type.as_sql()));
            }
        });
        let done = builder
            .build()
            .persistent(false)
            .execute(&mut self.conn)
            .await?;
        Ok(done.rows_affected())
    }

    async fn count_rows(&mut self, table: Table) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        sqlx::query_scalar::<_, i64>(&sql)
            .persistent(false)
            .fetch_one(&mut self.conn)
            .await
    }
}
