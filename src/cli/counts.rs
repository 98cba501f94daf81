//! Row counts for every warehouse table.

use crate::error::{EtlError, EtlResult};
use crate::sql::Table;
use crate::warehouse::Warehouse;

/// `None` when the table does not exist yet.
pub type TableCount = (Table, Option<i64>);

fn is_undefined_table_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("42P01"),
        _ => false,
    }
}

pub async fn collect_counts<W>(warehouse: &mut W) -> EtlResult<Vec<TableCount>>
where
    W: Warehouse + ?Sized,
{
    let mut counts = Vec::with_capacity(Table::ALL.len());
    for table in Table::ALL {
        let count = match warehouse.count_rows(table).await {
            Ok(n) => Some(n),
            Err(e) if is_undefined_table_error(&e) => None,
            Err(e) => return Err(EtlError::Connect(e)),
        };
        counts.push((table, count));
    }
    Ok(counts)
}

pub fn render_counts(counts: &[TableCount]) -> String {
    let width = counts
        .iter()
        .map(|(t, _)| t.name().len())
        .max()
        .unwrap_or_default();
    let mut out = String::from("=== Warehouse Row Counts ===\n");
    for (table, count) in counts {
        let shown = count.map_or_else(|| "missing".to_string(), |n| n.to_string());
        out.push_str(&format!("{:<width$}  {shown}\n", table.name()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::testing::RecordingWarehouse;

    #[tokio::test]
    async fn counts_every_table_in_catalogue_order() {
        let mut wh = RecordingWarehouse::default();
        wh.counts.insert(Table::Songplays, 6820);
        let counts = collect_counts(&mut wh).await.unwrap();
        assert_eq!(counts.len(), 7);
        assert_eq!(counts[0], (Table::StagingEvents, Some(0)));
        assert_eq!(counts[2], (Table::Songplays, Some(6820)));
    }

    #[test]
    fn renders_aligned_table() {
        let out = render_counts(&[(Table::StagingEvents, Some(8056)), (Table::Time, None)]);
        assert_eq!(
            out,
            "=== Warehouse Row Counts ===\nstaging_events  8056\ntime            missing\n"
        );
    }
}
