//! Output reconciliation: applies a finished `MatchRun` to the dataset it
//! came from.
//!
//! Excludes unmatched genes, annotates the survivors with their Entrez id
//! and stamps the table attributes downstream consumers read. Never mutates
//! the input table.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::ExtractionMode;
use crate::genes::{GeneDetails, GeneLookup, GeneRecord};
use crate::matching::{MatchResult, MatchRun};
use crate::table::{Domain, Table, TableError, Value, Variable};

/// Column name and column tag carrying Entrez ids.
pub const NCBI_ID: &str = "Entrez ID";
pub const TAX_ID: &str = "taxonomy_id";
pub const GENE_AS_ATTRIBUTE_NAME: &str = "gene_as_attribute_name";
pub const GENE_ID_COLUMN: &str = "gene_id_column";
pub const GENE_ID_ATTRIBUTE: &str = "gene_id_attribute";

/// Column/tag names of the fields added by `include_gene_info`.
const GENE_INFO_FIELDS: [&str; 6] = [
    "Symbol",
    "Synonyms",
    "Description",
    "Type of gene",
    "Chromosome",
    "Map location",
];

static NUMBERED_ID_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Entrez ID \(.*?\)").unwrap());

/// Values of `GENE_INFO_FIELDS`, in the same order.
fn gene_info(details: &GeneDetails) -> [String; 6] {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    [
        text(&details.symbol),
        details.synonyms_text(),
        text(&details.description),
        text(&details.type_of_gene),
        text(&details.chromosome),
        text(&details.map_location),
    ]
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("No gene column designated")]
    ColumnNotDesignated,

    #[error("Match run does not belong to this table: {0}")]
    RunMismatch(String),
}

/// Output options, as chosen by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub exclude_unmatched: bool,
    pub replace_id_with_symbol: bool,
    pub include_gene_info: bool,
}

impl OutputSpec {
    /// Options preselected after a run: exclusion is on when something
    /// did not match.
    pub fn suggested(run: &MatchRun) -> Self {
        Self {
            exclude_unmatched: run.unknown() > 0,
            ..Self::default()
        }
    }
}

/// The output table and the name under which it carries gene ids: a column
/// name in column mode, a column tag in attribute mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledTable {
    pub table: Table,
    pub id_key: String,
    pub mode: ExtractionMode,
}

impl ReconciledTable {
    /// Restrict the output to the selected genes.
    ///
    /// An empty selection keeps everything. In column mode a selection
    /// matching no row yields `None`.
    pub fn restrict_to(&self, selected: &[u64]) -> Option<Table> {
        if selected.is_empty() {
            return Some(self.table.clone());
        }
        let selected: HashSet<String> = selected.iter().map(u64::to_string).collect();

        match self.mode {
            ExtractionMode::AttributeNames => Some(self.table.retain_attributes(|_, var| {
                var.attributes
                    .get(&self.id_key)
                    .is_some_and(|id| selected.contains(id))
            })),
            ExtractionMode::ColumnValues { .. } => {
                let index = self.table.domain().index_of(&self.id_key)?;
                let rows: Vec<usize> = self
                    .table
                    .rows()
                    .iter()
                    .enumerate()
                    .filter(|(_, row)| row[index].as_text().is_some_and(|id| selected.contains(&id)))
                    .map(|(i, _)| i)
                    .collect();
                if rows.is_empty() {
                    None
                } else {
                    Some(self.table.select_rows(&rows))
                }
            }
        }
    }
}

/// Name for a new Entrez id column, given the existing names that start
/// with `Entrez ID`.
///
/// `Entrez ID` when there are none, otherwise `Entrez ID (n+1)` where `n`
/// counts names of the form `Entrez ID (...)`.
pub fn gene_id_key<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let existing: HashSet<&str> = existing.into_iter().collect();
    if existing.is_empty() {
        return NCBI_ID.to_string();
    }
    let numbered = existing.iter().filter(|name| NUMBERED_ID_KEY.is_match(name)).count();
    format!("{NCBI_ID} ({})", numbered + 1)
}

/// Apply `run` to `table` according to `spec`.
///
/// `mode` must be the mode the run's identifiers were extracted with. Gene
/// details are loaded through `lookup` only when a rename or gene info needs
/// them.
pub fn reconcile(
    table: &Table,
    run: &MatchRun,
    mode: &ExtractionMode,
    spec: &OutputSpec,
    lookup: &dyn GeneLookup,
) -> Result<ReconciledTable, ReconcileError> {
    let (mut output, id_key) = match mode {
        ExtractionMode::AttributeNames => (annotate_attributes(table, run, spec, lookup)?, NCBI_ID.to_string()),
        ExtractionMode::ColumnValues { column: None } => return Err(ReconcileError::ColumnNotDesignated),
        ExtractionMode::ColumnValues {
            column: Some(column),
        } => annotate_rows(table, run, column, spec, lookup)?,
    };

    output.set_attribute(TAX_ID, run.organism.as_str());
    output.set_attribute(GENE_AS_ATTRIBUTE_NAME, mode.uses_attribute_names());
    let id_attribute = if mode.uses_attribute_names() {
        GENE_ID_ATTRIBUTE
    } else {
        GENE_ID_COLUMN
    };
    output.set_attribute(id_attribute, id_key.as_str());

    tracing::info!(
        run_id = %run.run_id,
        organism = %run.organism,
        rows = output.n_rows(),
        columns = output.domain().len(),
        id_key = %id_key,
        "Match results applied to table"
    );

    Ok(ReconciledTable {
        table: output,
        id_key,
        mode: mode.clone(),
    })
}

/// Check that `run` was extracted from the attribute names of `table`:
/// one result per column, each named after its (trimmed) column.
fn check_attribute_run(table: &Table, run: &MatchRun) -> Result<(), ReconcileError> {
    let attributes = &table.domain().attributes;
    if attributes.len() != run.total() {
        return Err(ReconcileError::RunMismatch(format!(
            "{} results for {} attribute columns",
            run.total(),
            attributes.len()
        )));
    }
    match attributes
        .iter()
        .zip(&run.results)
        .find(|(var, result)| var.name.trim() != result.input_name)
    {
        Some((var, result)) => Err(ReconcileError::RunMismatch(format!(
            "column {:?} matched as {:?}",
            var.name, result.input_name
        ))),
        None => Ok(()),
    }
}

/// Genes as attribute names: results map to attribute columns by position.
fn annotate_attributes(
    table: &Table,
    run: &MatchRun,
    spec: &OutputSpec,
    lookup: &dyn GeneLookup,
) -> Result<Table, ReconcileError> {
    check_attribute_run(table, run)?;

    let mut annotated = table.clone();
    let mut keep = Vec::with_capacity(table.domain().attributes.len());

    for (i, var) in annotated.domain_mut().attributes.iter_mut().enumerate() {
        let gene = run.results.get(i).and_then(|r| r.gene.as_deref());
        keep.push(gene.is_some() || !spec.exclude_unmatched);

        let Some(gene) = gene else { continue };
        var.attributes.insert(NCBI_ID.to_string(), gene.ncbi_id.to_string());

        if !(spec.replace_id_with_symbol || spec.include_gene_info) {
            continue;
        }
        let Some(details) = load_details(gene, lookup) else { continue };

        if spec.include_gene_info {
            for (name, value) in GENE_INFO_FIELDS.iter().zip(gene_info(details)) {
                var.attributes.insert(name.to_string(), value);
            }
        }
        if spec.replace_id_with_symbol {
            match gene.symbol() {
                Some(symbol) => var.name = symbol.to_string(),
                None => tracing::debug!(column = %var.name, ncbi_id = gene.ncbi_id, "No symbol, column not renamed"),
            }
        }
    }

    if keep.iter().all(|k| *k) {
        return Ok(annotated);
    }
    Ok(annotated.retain_attributes(|i, _| keep.get(i).copied().unwrap_or(true)))
}

/// Genes in a column: filter rows, then append the Entrez id side column
/// unless an identical `Entrez ID` column is already there.
fn annotate_rows(
    table: &Table,
    run: &MatchRun,
    column: &str,
    spec: &OutputSpec,
    lookup: &dyn GeneLookup,
) -> Result<(Table, String), ReconcileError> {
    let index = table
        .domain()
        .index_of(column)
        .ok_or_else(|| TableError::ColumnNotFound(column.to_string()))?;

    let filtered = if spec.exclude_unmatched {
        let known = run.known_names();
        table.filter_rows(|row| row[index].as_text().is_some_and(|g| known.contains(g.as_str())))
    } else {
        table.clone()
    };

    let genes: Vec<Option<&GeneRecord>> = filtered
        .rows()
        .iter()
        .map(|row| {
            row[index]
                .as_text()
                .and_then(|g| run.result_for(&g))
                .and_then(|r: &MatchResult| r.gene.as_deref())
        })
        .collect();
    let ids: Vec<String> = genes
        .iter()
        .map(|g| g.map(|g| g.ncbi_id.to_string()).unwrap_or_default())
        .collect();

    let names = filtered.domain().names();
    let key = gene_id_key(names.iter().copied().filter(|n| n.starts_with(NCBI_ID)));

    let mut output = filtered.clone();
    let id_key = if filtered.domain().contains(NCBI_ID) && key != NCBI_ID {
        let existing: Vec<String> = filtered
            .column(NCBI_ID)?
            .into_iter()
            .map(|v| v.as_text().unwrap_or_default())
            .collect();
        if existing == ids {
            tracing::debug!("Existing Entrez ID column matches, reusing it");
            NCBI_ID.to_string()
        } else {
            output = output.concat_columns(&text_column(&key, &ids)?)?;
            key
        }
    } else {
        output = output.concat_columns(&text_column(&key, &ids)?)?;
        key
    };

    if spec.include_gene_info {
        let info: Vec<Option<[String; 6]>> = genes
            .iter()
            .map(|g| g.and_then(|g| load_details(g, lookup)).map(gene_info))
            .collect();
        let mut taken: HashSet<String> = output.domain().names().into_iter().map(str::to_string).collect();
        for (field, name) in GENE_INFO_FIELDS.iter().enumerate() {
            let name = unique_name(&taken, name);
            let values: Vec<String> = info
                .iter()
                .map(|row| row.as_ref().map(|v| v[field].clone()).unwrap_or_default())
                .collect();
            output = output.concat_columns(&text_column(&name, &values)?)?;
            taken.insert(name);
        }
    }

    Ok((output, id_key))
}

fn text_column(name: &str, values: &[String]) -> Result<Table, TableError> {
    Table::new(
        Domain::with_metas(vec![Variable::text(name)]),
        values.iter().map(|v| vec![Value::text(v.as_str())]).collect(),
    )
}

/// `proposed`, or `proposed (n)` with the smallest free `n`.
fn unique_name(taken: &HashSet<String>, proposed: &str) -> String {
    if !taken.contains(proposed) {
        return proposed.to_string();
    }
    (1..)
        .map(|n| format!("{proposed} ({n})"))
        .find(|name| !taken.contains(name))
        .unwrap_or_else(|| proposed.to_string())
}

fn load_details<'a>(gene: &'a GeneRecord, lookup: &dyn GeneLookup) -> Option<&'a GeneDetails> {
    match gene.load(lookup) {
        Ok(details) => Some(details),
        Err(e) => {
            tracing::warn!(ncbi_id = gene.ncbi_id, error = %e, "Gene details unavailable");
            None
        }
    }
}
