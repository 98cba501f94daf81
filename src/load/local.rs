//! Client-side staging for warehouses without COPY-from-object-storage.
//!
//! Follows COPY's JSON field mapping. `auto` requires a field name equal to
//! the column name as the warehouse stores it (lower case), so `userId` in
//! the source does not fill `userid`. `auto ignorecase` drops the case
//! requirement. A JSONPaths descriptor maps one expression to each column in
//! order. Absent fields load as NULL.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::FieldMapping;
use crate::error::{EtlError, EtlResult};
use crate::sql::Table;
use crate::util::db::INSERT_BATCH_ROWS;
use crate::warehouse::Warehouse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSource {
    pub table: Table,
    /// A JSON file, or a directory searched recursively for `*.json`.
    pub path: PathBuf,
    pub mapping: FieldMapping,
}

impl LocalSource {
    fn error(&self, message: impl Into<String>) -> EtlError {
        EtlError::StagingSource {
            table: self.table,
            path: self.path.display().to_string(),
            message: message.into(),
        }
    }
}

/// Load every record under `source.path` into `source.table`.
/// Returns the number of rows inserted.
pub async fn stage_local<W>(warehouse: &mut W, source: &LocalSource) -> EtlResult<u64>
where
    W: Warehouse + ?Sized,
{
    let projection = Projection::resolve(source).await?;
    let files = collect_json_files(source)?;
    info!(table = %source.table, files = files.len(), mapping = %source.mapping, "staging local JSON");

    let mut staged = 0u64;
    for file in &files {
        let text = tokio::fs::read_to_string(file).await.map_err(|e| EtlError::StagingSource {
            table: source.table,
            path: file.display().to_string(),
            message: e.to_string(),
        })?;
        let rows = parse_rows(&text, &projection).map_err(|message| EtlError::StagingSource {
            table: source.table,
            path: file.display().to_string(),
            message,
        })?;
        for chunk in rows.chunks(INSERT_BATCH_ROWS) {
            staged += warehouse
                .insert_rows(source.table, chunk)
                .await
                .map_err(|e| EtlError::Load {
                    table: source.table,
                    source: e,
                })?;
        }
        debug!(table = %source.table, file = %file.display(), rows = rows.len(), "file staged");
    }
    Ok(staged)
}

fn collect_json_files(source: &LocalSource) -> EtlResult<Vec<PathBuf>> {
    let root = source.path.as_path();
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(source.error("path does not exist"));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| source.error(e.to_string()))?;
        if entry.file_type().is_file() && has_json_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    if files.is_empty() {
        return Err(source.error("no JSON files found"));
    }
    Ok(files)
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// How a JSON object becomes a staging row.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Projection {
    Auto { table: Table, ignore_case: bool },
    Paths(Vec<JsonPath>),
}

impl Projection {
    async fn resolve(source: &LocalSource) -> EtlResult<Self> {
        let descriptor = match &source.mapping {
            FieldMapping::Auto => {
                return Ok(Projection::Auto {
                    table: source.table,
                    ignore_case: false,
                })
            }
            FieldMapping::AutoIgnoreCase => {
                return Ok(Projection::Auto {
                    table: source.table,
                    ignore_case: true,
                })
            }
            FieldMapping::JsonPaths(path) => path,
        };
        let text = tokio::fs::read_to_string(descriptor)
            .await
            .map_err(|e| source.error(format!("cannot read JSONPaths file {descriptor}: {e}")))?;
        let paths = parse_jsonpaths(&text).map_err(|e| source.error(e))?;
        let width = source.table.columns().len();
        if paths.len() != width {
            return Err(source.error(format!(
                "JSONPaths file {descriptor} has {} expressions but {} has {width} columns",
                paths.len(),
                source.table
            )));
        }
        Ok(Projection::Paths(paths))
    }

    fn project(&self, record: &Map<String, Value>) -> Vec<Option<String>> {
        match self {
            Projection::Auto { table, ignore_case } => table
                .columns()
                .iter()
                .map(|column| {
                    let stored = column.name.to_ascii_lowercase();
                    record
                        .iter()
                        .find(|(key, _)| {
                            if *ignore_case {
                                key.eq_ignore_ascii_case(&stored)
                            } else {
                                **key == stored
                            }
                        })
                        .and_then(|(_, value)| value_to_text(value))
                })
                .collect(),
            Projection::Paths(paths) => paths
                .iter()
                .map(|path| path.resolve(record).and_then(value_to_text))
                .collect(),
        }
    }
}

/// Parse a file holding any number of JSON objects, concatenated or one per line.
fn parse_rows(text: &str, projection: &Projection) -> Result<Vec<Vec<Option<String>>>, String> {
    let mut rows = Vec::new();
    for (index, record) in serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .enumerate()
    {
        let record = record.map_err(|e| format!("malformed JSON: {e}"))?;
        let Value::Object(object) = record else {
            return Err(format!("record {} is not a JSON object", index + 1));
        };
        rows.push(projection.project(&object));
    }
    Ok(rows)
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct JsonPathsFile {
    jsonpaths: Vec<String>,
}

fn parse_jsonpaths(text: &str) -> Result<Vec<JsonPath>, String> {
    let file: JsonPathsFile =
        serde_json::from_str(text).map_err(|e| format!("invalid JSONPaths file: {e}"))?;
    file.jsonpaths.iter().map(|expr| expr.parse()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// A JSONPath expression restricted to member and array-index access, the
/// subset COPY accepts: `$['a']`, `$["a"]`, `$.a`, `$.a[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn resolve<'v>(&self, record: &'v Map<String, Value>) -> Option<&'v Value> {
        let mut segments = self.segments.iter();
        let mut current = match segments.next()? {
            Segment::Key(key) => record.get(key)?,
            Segment::Index(_) => return None,
        };
        for segment in segments {
            current = match segment {
                Segment::Key(key) => current.as_object()?.get(key)?,
                Segment::Index(i) => current.as_array()?.get(*i)?,
            };
        }
        Some(current)
    }
}

impl FromStr for JsonPath {
    type Err = String;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let invalid = |why: &str| format!("invalid JSONPath {expr:?}: {why}");
        let mut rest = expr
            .trim()
            .strip_prefix('$')
            .ok_or_else(|| invalid("must start with $"))?;
        let mut segments = Vec::new();

        while !rest.is_empty() {
            if let Some(bracketed) = rest.strip_prefix('[') {
                match bracketed.chars().next() {
                    Some(quote @ ('\'' | '"')) => {
                        let body = &bracketed[1..];
                        let end = body.find(quote).ok_or_else(|| invalid("unterminated quote"))?;
                        let after = body[end + 1..]
                            .strip_prefix(']')
                            .ok_or_else(|| invalid("expected ] after quoted key"))?;
                        segments.push(Segment::Key(body[..end].to_string()));
                        rest = after;
                    }
                    _ => {
                        let end = bracketed.find(']').ok_or_else(|| invalid("unterminated ["))?;
                        let index = bracketed[..end]
                            .trim()
                            .parse::<usize>()
                            .map_err(|_| invalid("array index must be a non-negative integer"))?;
                        segments.push(Segment::Index(index));
                        rest = &bracketed[end + 1..];
                    }
                }
            } else if let Some(dotted) = rest.strip_prefix('.') {
                let end = dotted.find(['.', '[']).unwrap_or(dotted.len());
                if end == 0 {
                    return Err(invalid("empty member name"));
                }
                segments.push(Segment::Key(dotted[..end].to_string()));
                rest = &dotted[end..];
            } else {
                return Err(invalid("expected . or ["));
            }
        }

        if segments.is_empty() {
            return Err(invalid("selects the whole record"));
        }
        Ok(Self { segments })
    }
}
