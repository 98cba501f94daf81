//! Per-statement timings and row counts collected while a run progresses.

use std::time::Duration;

use tracing::info;

use crate::sql::{StatementKind, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub table: Table,
    pub kind: StatementKind,
    /// Rows affected as reported by the warehouse (0 for DDL).
    pub rows: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub steps: Vec<StepReport>,
}

impl LoadReport {
    pub fn push(&mut self, step: StepReport) {
        self.steps.push(step);
    }

    pub fn extend(&mut self, other: LoadReport) {
        self.steps.extend(other.steps);
    }

    /// Rows written to `table` by statements of `kind`, if any ran.
    pub fn rows_for(&self, table: Table, kind: StatementKind) -> Option<u64> {
        self.steps
            .iter()
            .filter(|s| s.table == table && s.kind == kind)
            .map(|s| s.rows)
            .reduce(|a, b| a + b)
    }

    pub fn elapsed(&self) -> Duration {
        self.steps.iter().map(|s| s.elapsed).sum()
    }

    pub fn log_summary(&self, title: &str) {
        for step in &self.steps {
            info!(
                target: "report",
                title,
                table = %step.table,
                kind = %step.kind,
                rows = step.rows,
                elapsed_ms = step.elapsed.as_millis() as u64,
                "step"
            );
        }
        info!(
            target: "report",
            title,
            statements = self.steps.len(),
            elapsed_ms = self.elapsed().as_millis() as u64,
            "completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(table: Table, kind: StatementKind, rows: u64, ms: u64) -> StepReport {
        StepReport {
            table,
            kind,
            rows,
            elapsed: Duration::from_millis(ms),
        }
    }

    #[test]
    fn sums_rows_per_table_and_kind() {
        let mut report = LoadReport::default();
        report.push(step(Table::StagingEvents, StatementKind::Copy, 500, 10));
        report.push(step(Table::StagingEvents, StatementKind::Copy, 120, 5));
        report.push(step(Table::Users, StatementKind::Insert, 96, 3));

        assert_eq!(report.rows_for(Table::StagingEvents, StatementKind::Copy), Some(620));
        assert_eq!(report.rows_for(Table::Users, StatementKind::Insert), Some(96));
        assert_eq!(report.rows_for(Table::Songs, StatementKind::Insert), None);
        assert_eq!(report.elapsed(), Duration::from_millis(18));
    }
}
