//! Operations shared by the `dwh`, `create_tables` and `etl` binaries.

pub mod audit;
pub mod counts;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{DwhConfig, CONFIG_KEYS};
use crate::load::LoadOrchestrator;
use crate::pipeline::Pipeline;
use crate::report::LoadReport;
use crate::schema::SchemaManager;
use crate::util::db::PgWarehouse;
use crate::util::env as env_util;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Drop and recreate all seven tables.
    CreateTables,
    /// Stage then transform into existing tables.
    Etl,
    Stage,
    Transform,
    /// Create tables, then stage and transform.
    Run,
    Counts,
    Audit,
    /// Print the statements without connecting.
    Plan,
}

/// Resolve configuration from `.env`/environment plus command-line overrides.
pub fn load_config(dialect: Option<String>, db_url: Option<String>) -> Result<DwhConfig> {
    let mut overrides = Vec::new();
    if let Some(d) = dialect {
        overrides.push(("DWH_DIALECT", d));
    }
    if let Some(url) = db_url {
        overrides.push(("DWH_DATABASE_URL", url));
    }
    env_util::log_config_snapshot("dwh", CONFIG_KEYS);
    let config = DwhConfig::from_env_with(&overrides).context("invalid warehouse configuration")?;
    info!(target = "preflight", resolved = %resolved_summary(&config), "effective configuration");
    Ok(config)
}

/// The configuration actually in effect, after command-line overrides.
/// Credentials in the DSN are redacted.
pub fn resolved_summary(config: &DwhConfig) -> String {
    format!(
        "dialect={} connection={} song_data={} log_data={} log_mapping={} region={} iam_role={}",
        config.dialect,
        config.connection.redacted(),
        config.sources.song_data,
        config.sources.log_data,
        config.sources.log_mapping,
        config.region,
        config.iam_role_arn.as_deref().unwrap_or("-"),
    )
}

pub async fn execute(config: &DwhConfig, op: Operation) -> Result<()> {
    if op == Operation::Plan {
        print!("{}", render_plan(config)?);
        return Ok(());
    }

    // Build everything that can fail on configuration before connecting.
    let pipeline = Pipeline::new(config)?;
    let mut warehouse = PgWarehouse::connect(&config.connection).await?;

    let report: Option<LoadReport> = match op {
        Operation::CreateTables => Some(pipeline.schema().recreate(&mut warehouse).await?),
        Operation::Etl => Some(pipeline.loader().run(&mut warehouse).await?),
        Operation::Stage => Some(pipeline.loader().stage(&mut warehouse).await?),
        Operation::Transform => Some(pipeline.loader().transform(&mut warehouse).await?),
        Operation::Run => Some(pipeline.run(&mut warehouse).await?),
        Operation::Counts => {
            let counts = counts::collect_counts(&mut warehouse).await?;
            print!("{}", counts::render_counts(&counts));
            None
        }
        Operation::Audit => {
            let audits = audit::audit_schema(warehouse.connection_mut()).await?;
            print!("{}", audit::render_audit(&audits));
            if audits.iter().any(|a| !a.is_clean()) {
                info!("schema drift detected");
            }
            None
        }
        Operation::Plan => None,
    };

    if let Some(report) = report {
        report.log_summary(&format!("{op:?}"));
    }
    warehouse.close().await?;
    Ok(())
}

/// DDL followed by the load statements, as `run` would issue them.
pub fn render_plan(config: &DwhConfig) -> Result<String> {
    let loader = LoadOrchestrator::new(config)?;
    let schema = SchemaManager::new(config.dialect);
    let mut out = String::new();
    for stmt in schema.drop_statements().iter().chain(&schema.create_statements()) {
        out.push_str(&format!("{};\n", stmt.sql));
    }
    out.push('\n');
    out.push_str(&loader.describe());
    Ok(out)
}
