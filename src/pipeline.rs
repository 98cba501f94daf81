//! Full refresh: recreate the schema, then stage and transform.

use tracing::info;

use crate::config::DwhConfig;
use crate::error::EtlResult;
use crate::load::LoadOrchestrator;
use crate::report::LoadReport;
use crate::schema::SchemaManager;
use crate::warehouse::Warehouse;

#[derive(Debug, Clone)]
pub struct Pipeline {
    schema: SchemaManager,
    loader: LoadOrchestrator,
}

impl Pipeline {
    pub fn new(config: &DwhConfig) -> EtlResult<Self> {
        // Loader first: it carries every config check, and none of them
        // should be discovered after the tables have already been dropped.
        let loader = LoadOrchestrator::new(config)?;
        Ok(Self {
            schema: SchemaManager::new(config.dialect),
            loader,
        })
    }

    pub fn schema(&self) -> &SchemaManager {
        &self.schema
    }

    pub fn loader(&self) -> &LoadOrchestrator {
        &self.loader
    }

    pub async fn run<W>(&self, warehouse: &mut W) -> EtlResult<LoadReport>
    where
        W: Warehouse + ?Sized,
    {
        let mut report = self.schema.recreate(warehouse).await?;
        report.extend(self.loader.run(warehouse).await?);
        info!(statements = report.steps.len(), "pipeline finished");
        Ok(report)
    }
}
