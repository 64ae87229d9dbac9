//! Identifier extraction: turns a dataset into the ordered list of raw gene
//! identifiers the matcher resolves.
//!
//! Two modes. Genes as column names reads the attribute column names; genes
//! in a column reads the cells of one designated text or discrete column.

use serde::{Deserialize, Serialize};

use crate::reconcile::{GENE_AS_ATTRIBUTE_NAME, TAX_ID};
use crate::table::Table;

/// Where the gene identifiers of a table live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Attribute column names are the identifiers.
    AttributeNames,
    /// Values of the designated column are the identifiers.
    ColumnValues { column: Option<String> },
}

impl ExtractionMode {
    pub fn column(name: impl Into<String>) -> Self {
        Self::ColumnValues {
            column: Some(name.into()),
        }
    }

    pub fn uses_attribute_names(&self) -> bool {
        matches!(self, Self::AttributeNames)
    }
}

/// Raw identifiers of `table`, in column or row order.
///
/// Attribute names are trimmed and never filtered. Column values skip
/// missing cells. An undesignated or absent column yields nothing, and the
/// caller must not start a match run on an empty result.
pub fn extract(table: &Table, mode: &ExtractionMode) -> Vec<String> {
    match mode {
        ExtractionMode::AttributeNames => table
            .domain()
            .attributes
            .iter()
            .map(|var| var.name.trim().to_string())
            .collect(),
        ExtractionMode::ColumnValues { column: None } => Vec::new(),
        ExtractionMode::ColumnValues {
            column: Some(column),
        } => match table.column(column) {
            Ok(cells) => cells.into_iter().filter_map(|v| v.as_text()).collect(),
            Err(e) => {
                tracing::debug!(column = %column, error = %e, "Gene column not in table");
                Vec::new()
            }
        },
    }
}

/// Columns that may hold gene identifiers, in domain order.
///
/// The first entry is the default designated column.
pub fn gene_column_candidates(table: &Table) -> Vec<&str> {
    table
        .domain()
        .iter()
        .map(|(_, var)| var)
        .filter(|var| var.holds_labels())
        .map(|var| var.name.as_str())
        .collect()
}

/// Settings a previous run stamped on the table, used to preselect the
/// organism and extraction mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputHints {
    pub organism: Option<String>,
    pub gene_as_attribute_name: Option<bool>,
}

impl InputHints {
    pub fn from_table(table: &Table) -> Self {
        let organism = table.attribute(TAX_ID).and_then(|v| match v {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let gene_as_attribute_name = table
            .attribute(GENE_AS_ATTRIBUTE_NAME)
            .and_then(serde_json::Value::as_bool);

        Self {
            organism,
            gene_as_attribute_name,
        }
    }

    /// Mode to preselect: the hinted one, else `fallback`. Column mode
    /// designates the first candidate column.
    pub fn mode(&self, table: &Table, fallback: ExtractionMode) -> ExtractionMode {
        match self.gene_as_attribute_name {
            Some(true) => ExtractionMode::AttributeNames,
            Some(false) => ExtractionMode::ColumnValues {
                column: gene_column_candidates(table).first().map(|s| s.to_string()),
            },
            None => fallback,
        }
    }
}
