//! Redshift COPY statements for the staging tables.

use super::{quote_literal, Statement, StatementKind, Table};
use crate::config::FieldMapping;
use crate::error::EtlResult;

/// Build `COPY <table> FROM '<source>' ...` for a staging table.
///
/// Compression analysis and statistics updates are switched off; the staging
/// tables are reloaded on every run and only read once.
pub fn copy_statement(
    table: Table,
    source: &str,
    iam_role_arn: &str,
    region: &str,
    mapping: &FieldMapping,
) -> EtlResult<Statement> {
    let source = quote_literal("staging source", source)?;
    let credentials = quote_literal("IAM role ARN", &format!("aws_iam_role={iam_role_arn}"))?;
    let region = quote_literal("region", region)?;
    let format = match mapping {
        FieldMapping::Auto => "'auto'".to_string(),
        FieldMapping::AutoIgnoreCase => "'auto ignorecase'".to_string(),
        FieldMapping::JsonPaths(path) => quote_literal("JSONPaths location", path)?,
    };

    Ok(Statement::new(
        table,
        StatementKind::Copy,
        format!(
            "COPY {} FROM {}\nCREDENTIALS {}\nREGION {}\nCOMPUPDATE OFF STATUPDATE OFF\nJSON {}",
            table.name(),
            source,
            credentials,
            region,
            format
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;

    const ARN: &str = "arn:aws:iam::123456789012:role/dwhRole";

    #[test]
    fn events_copy_uses_jsonpaths() {
        let stmt = copy_statement(
            Table::StagingEvents,
            "s3://udacity-dend/log_data",
            ARN,
            "us-west-2",
            &FieldMapping::JsonPaths("s3://udacity-dend/log_json_path.json".into()),
        )
        .unwrap();
        assert_eq!(stmt.kind, StatementKind::Copy);
        assert_eq!(
            stmt.sql,
            "COPY staging_events FROM 's3://udacity-dend/log_data'\n\
             CREDENTIALS 'aws_iam_role=arn:aws:iam::123456789012:role/dwhRole'\n\
             REGION 'us-west-2'\n\
             COMPUPDATE OFF STATUPDATE OFF\n\
             JSON 's3://udacity-dend/log_json_path.json'"
        );
    }

    #[test]
    fn songs_copy_uses_auto_mapping() {
        let stmt = copy_statement(
            Table::StagingSongs,
            "s3://udacity-dend/song_data",
            ARN,
            "us-west-2",
            &FieldMapping::Auto,
        )
        .unwrap();
        assert!(stmt.sql.starts_with("COPY staging_songs FROM 's3://udacity-dend/song_data'"));
        assert!(stmt.sql.ends_with("JSON 'auto'"));
    }

    #[test]
    fn ignorecase_mapping_is_passed_through() {
        let stmt = copy_statement(
            Table::StagingEvents,
            "s3://udacity-dend/log_data",
            ARN,
            "us-west-2",
            &FieldMapping::AutoIgnoreCase,
        )
        .unwrap();
        assert!(stmt.sql.ends_with("JSON 'auto ignorecase'"));
    }

    #[test]
    fn rejects_quote_in_any_argument() {
        let bad_source = copy_statement(
            Table::StagingSongs,
            "s3://bucket/o'brien",
            ARN,
            "us-west-2",
            &FieldMapping::Auto,
        );
        assert!(matches!(bad_source, Err(EtlError::Config(_))));

        let bad_arn = copy_statement(
            Table::StagingSongs,
            "s3://bucket/songs",
            "arn'; DROP TABLE songs; --",
            "us-west-2",
            &FieldMapping::Auto,
        );
        assert!(matches!(bad_arn, Err(EtlError::Config(_))));

        let bad_paths = copy_statement(
            Table::StagingEvents,
            "s3://bucket/log",
            ARN,
            "us-west-2",
            &FieldMapping::JsonPaths("s3://bucket/paths.json;".into()),
        );
        assert!(matches!(bad_paths, Err(EtlError::Config(_))));
    }
}
