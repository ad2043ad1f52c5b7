use crate::normalize::GeneKey;
use polars::prelude::PolarsError;
use serde_derive::Serialize;
use std::fmt;
use std::path;

/// The four input tables consumed by the merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SourceKind {
    Expression,
    Tractability,
    Pathways,
    DrugInteractions,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceKind::Expression => "expression",
            SourceKind::Tractability => "tractability",
            SourceKind::Pathways => "pathways",
            SourceKind::DrugInteractions => "drug interactions",
        };
        f.write_str(label)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TractomeError {
    /// Input table not supplied (`column` is `None`) or lacking a required key column.
    #[error("{kind} source unavailable{}", missing_suffix(.column))]
    MissingSource { kind: SourceKind, column: Option<String> },
    /// Input file given but it could not be read as a table.
    #[error("{kind} source unreadable at {path}: {reason}")]
    Unreadable { kind: SourceKind, path: String, reason: String },
    #[error("column '{name}' has {actual} cells but the table has {expected} rows")]
    ColumnLength { name: String, expected: usize, actual: usize },
    #[error("right join operand has duplicate key '{0}'")]
    NonUniqueJoinKey(GeneKey),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yml::Error),
}

fn missing_suffix(column: &Option<String>) -> String {
    match column {
        Some(column) => format!(": missing column '{}'", column),
        None => String::new(),
    }
}

impl TractomeError {
    pub fn not_supplied(kind: SourceKind) -> Self {
        TractomeError::MissingSource { kind, column: None }
    }

    pub fn missing_column(kind: SourceKind, column: &str) -> Self {
        TractomeError::MissingSource {
            kind,
            column: Some(column.to_string()),
        }
    }

    pub fn unreadable(kind: SourceKind, path: &path::Path, reason: &TractomeError) -> Self {
        TractomeError::Unreadable {
            kind,
            path: path.to_string_lossy().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A field value that violates its column's semantic type.
///
/// The value is left out of numeric aggregation; the row itself survives
/// unless the violated field is the join key.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchemaIssue {
    pub source: SourceKind,
    pub row: usize,
    pub column: String,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row {} column '{}': {} ({:?})", self.source, self.row, self.column, self.reason, self.value)
    }
}

/// An expression gene without a partner row in another source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyMismatch {
    pub source: SourceKind,
    pub gene: GeneKey,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_source_messages() {
        assert_eq!(TractomeError::not_supplied(SourceKind::Pathways).to_string(), "pathways source unavailable");
        assert_eq!(
            TractomeError::missing_column(SourceKind::DrugInteractions, "Gene").to_string(),
            "drug interactions source unavailable: missing column 'Gene'"
        );
    }
}
