//! Ordering of the star-schema inserts.
//!
//! Each step names the star-schema tables it reads. The plan runs steps in a
//! stable topological order: whenever several steps are ready, the one
//! declared first goes first.

use crate::config::Dialect;
use crate::error::{EtlError, EtlResult};
use crate::sql::transform::insert_statement;
use crate::sql::{Statement, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformStep {
    pub target: Table,
    /// Star-schema tables that must be populated before this step runs.
    pub depends_on: &'static [Table],
}

/// The five star-schema inserts and what each reads besides staging.
pub const TRANSFORM_STEPS: [TransformStep; 5] = [
    TransformStep {
        target: Table::Songplays,
        depends_on: &[Table::Songs, Table::Artists],
    },
    TransformStep {
        target: Table::Users,
        depends_on: &[],
    },
    TransformStep {
        target: Table::Songs,
        depends_on: &[],
    },
    TransformStep {
        target: Table::Artists,
        depends_on: &[],
    },
    TransformStep {
        target: Table::Time,
        depends_on: &[Table::Songplays],
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformPlan {
    inserts: Vec<Statement>,
}

impl TransformPlan {
    pub fn standard(dialect: Dialect) -> EtlResult<Self> {
        Self::new(&TRANSFORM_STEPS, dialect)
    }

    pub fn new(declared: &[TransformStep], dialect: Dialect) -> EtlResult<Self> {
        for (i, step) in declared.iter().enumerate() {
            if declared[..i].iter().any(|s| s.target == step.target) {
                return Err(EtlError::Config(format!(
                    "transform for {} declared twice",
                    step.target
                )));
            }
            if let Some(dep) = step
                .depends_on
                .iter()
                .find(|dep| !declared.iter().any(|s| s.target == **dep))
            {
                return Err(EtlError::Config(format!(
                    "transform for {} depends on {}, which no step populates",
                    step.target, dep
                )));
            }
        }

        let mut pending: Vec<&TransformStep> = declared.iter().collect();
        let mut done: Vec<Table> = Vec::with_capacity(declared.len());
        let mut inserts = Vec::with_capacity(declared.len());
        while !pending.is_empty() {
            let ready = pending
                .iter()
                .position(|s| s.depends_on.iter().all(|dep| done.contains(dep)));
            let Some(index) = ready else {
                let stuck: Vec<_> = pending.iter().map(|s| s.target.name()).collect();
                return Err(EtlError::Config(format!(
                    "transform dependencies form a cycle among: {}",
                    stuck.join(", ")
                )));
            };
            let step = pending.remove(index);
            let statement = insert_statement(step.target, dialect).ok_or_else(|| {
                EtlError::Config(format!("{} is a staging table, not a transform target", step.target))
            })?;
            done.push(step.target);
            inserts.push(statement);
        }
        Ok(Self { inserts })
    }

    pub fn inserts(&self) -> &[Statement] {
        &self.inserts
    }

    pub fn order(&self) -> Vec<Table> {
        self.inserts.iter().map(|s| s.table).collect()
    }
}
