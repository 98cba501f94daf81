//! Two-phase load: bulk-stage raw JSON, then populate the star schema.
//!
//! Phase A stages events then songs. Phase B runs the transform plan. Both
//! phases stop at the first failure; nothing is retried.

pub mod local;
pub mod plan;

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument};

use crate::config::{Dialect, DwhConfig, FieldMapping};
use crate::error::{EtlError, EtlResult};
use crate::report::{LoadReport, StepReport};
use crate::sql::copy::copy_statement;
use crate::sql::{Statement, StatementKind, Table};
use crate::warehouse::{run_statement, Warehouse};

use self::local::{stage_local, LocalSource};
use self::plan::TransformPlan;

/// How one staging table gets filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingStep {
    /// Server-side COPY from object storage.
    Copy(Statement),
    /// Client-side read of local JSON files.
    Local(LocalSource),
}

impl StagingStep {
    pub fn table(&self) -> Table {
        match self {
            StagingStep::Copy(stmt) => stmt.table,
            StagingStep::Local(source) => source.table,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOrchestrator {
    staging: Vec<StagingStep>,
    transforms: TransformPlan,
}

impl LoadOrchestrator {
    /// Resolve every statement up front so configuration problems surface
    /// before the first one is issued.
    pub fn new(config: &DwhConfig) -> EtlResult<Self> {
        config.validate()?;
        let sources = &config.sources;
        let staging = match config.dialect {
            Dialect::Redshift => {
                let role = config.iam_role_arn.as_deref().ok_or_else(|| {
                    EtlError::Config("DWH_IAM_ROLE_ARN is required for COPY".into())
                })?;
                vec![
                    StagingStep::Copy(copy_statement(
                        Table::StagingEvents,
                        &sources.log_data,
                        role,
                        &config.region,
                        &sources.log_mapping,
                    )?),
                    StagingStep::Copy(copy_statement(
                        Table::StagingSongs,
                        &sources.song_data,
                        role,
                        &config.region,
                        &FieldMapping::Auto,
                    )?),
                ]
            }
            Dialect::Postgres => vec![
                StagingStep::Local(LocalSource {
                    table: Table::StagingEvents,
                    path: PathBuf::from(&sources.log_data),
                    mapping: sources.log_mapping.clone(),
                }),
                StagingStep::Local(LocalSource {
                    table: Table::StagingSongs,
                    path: PathBuf::from(&sources.song_data),
                    mapping: FieldMapping::Auto,
                }),
            ],
        };
        Ok(Self {
            staging,
            transforms: TransformPlan::standard(config.dialect)?,
        })
    }

    pub fn staging_steps(&self) -> &[StagingStep] {
        &self.staging
    }

    pub fn transform_plan(&self) -> &TransformPlan {
        &self.transforms
    }

    /// Phase A. Populates the staging tables from their sources.
    #[instrument(skip_all)]
    pub async fn stage<W>(&self, warehouse: &mut W) -> EtlResult<LoadReport>
    where
        W: Warehouse + ?Sized,
    {
        let mut report = LoadReport::default();
        for step in &self.staging {
            let table = step.table();
            info!(%table, "staging");
            let done = match step {
                StagingStep::Copy(statement) => run_statement(warehouse, statement)
                    .await
                    .map_err(|source| EtlError::Load { table, source })?,
                StagingStep::Local(source) => {
                    let started = Instant::now();
                    let rows = stage_local(warehouse, source).await?;
                    StepReport {
                        table,
                        kind: StatementKind::Copy,
                        rows,
                        elapsed: started.elapsed(),
                    }
                }
            };
            report.push(done);
        }
        Ok(report)
    }

    /// Phase B. Assumes the staging tables are already loaded.
    #[instrument(skip_all)]
    pub async fn transform<W>(&self, warehouse: &mut W) -> EtlResult<LoadReport>
    where
        W: Warehouse + ?Sized,
    {
        let mut report = LoadReport::default();
        for statement in self.transforms.inserts() {
            let done = run_statement(warehouse, statement)
                .await
                .map_err(|source| EtlError::Transform {
                    table: statement.table,
                    source,
                })?;
            report.push(done);
        }
        Ok(report)
    }

    /// Phase A then phase B. Phase B is not attempted if staging fails.
    pub async fn run<W>(&self, warehouse: &mut W) -> EtlResult<LoadReport>
    where
        W: Warehouse + ?Sized,
    {
        let mut report = self.stage(warehouse).await?;
        report.extend(self.transform(warehouse).await?);
        Ok(report)
    }

    /// Human-readable listing of what `run` would execute.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for step in &self.staging {
            match step {
                StagingStep::Copy(stmt) => {
                    out.push_str(&format!("-- stage {}\n{};\n\n", stmt.table, stmt.sql));
                }
                StagingStep::Local(source) => {
                    out.push_str(&format!(
                        "-- stage {} from local {} ({})\n\n",
                        source.table,
                        source.path.display(),
                        source.mapping
                    ));
                }
            }
        }
        for stmt in self.transforms.inserts() {
            out.push_str(&format!("-- transform {}\n{};\n\n", stmt.table, stmt.sql));
        }
        out
    }
}
