// Reader for NCBI `gene_info` tab-separated files.
//
// Columns used (0-based): tax_id, GeneID, Symbol, LocusTag, Synonyms,
// dbXrefs, chromosome, map_location, description, type_of_gene.
// NCBI writes "-" for empty fields and "|" between list entries.

use std::collections::BTreeMap;
use std::io::BufRead;

use super::{GeneDetails, LookupError, SqliteGeneLookup};

/// Minimum number of columns a data line must have.
const MIN_COLUMNS: usize = 10;

/// Rows buffered before each database write.
const IMPORT_CHUNK: usize = 5_000;

/// One parsed `gene_info` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneInfoRow {
    pub tax_id: String,
    pub ncbi_id: u64,
    pub details: GeneDetails,
}

fn field(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "-" {
        None
    } else {
        Some(value.to_string())
    }
}

fn list(value: &str) -> Vec<String> {
    field(value)
        .map(|v| {
            v.split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse one data line. `line_no` is only used in error messages.
pub fn parse_gene_info_line(line: &str, line_no: usize) -> Result<GeneInfoRow, LookupError> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() < MIN_COLUMNS {
        return Err(LookupError::Import {
            line: line_no,
            reason: format!("expected at least {MIN_COLUMNS} columns, found {}", cols.len()),
        });
    }

    let tax_id = field(cols[0]).ok_or_else(|| LookupError::Import {
        line: line_no,
        reason: "missing tax_id".into(),
    })?;
    let ncbi_id = cols[1].trim().parse::<u64>().map_err(|e| LookupError::Import {
        line: line_no,
        reason: format!("invalid GeneID {:?}: {e}", cols[1]),
    })?;

    // "HGNC:HGNC:11998" → ("HGNC", "HGNC:11998"); the first colon splits.
    let mut db_refs: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in list(cols[5]) {
        if let Some((db, id)) = entry.split_once(':') {
            db_refs.entry(db.to_string()).or_default().push(id.to_string());
        }
    }

    Ok(GeneInfoRow {
        tax_id,
        ncbi_id,
        details: GeneDetails {
            symbol: field(cols[2]),
            locus_tag: field(cols[3]),
            synonyms: list(cols[4]),
            db_refs,
            chromosome: field(cols[6]),
            map_location: field(cols[7]),
            description: field(cols[8]),
            type_of_gene: field(cols[9]),
        },
    })
}

/// Summary of an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub genes: usize,
    pub skipped_organisms: usize,
}

/// Load `gene_info` text into the database.
///
/// Header and comment lines (`#`) and blank lines are skipped. When
/// `organisms` is non-empty only those taxonomy ids are kept. A malformed
/// data line aborts the import with its line number; chunks already written
/// stay in the database.
pub fn import_gene_info<R: BufRead>(
    lookup: &SqliteGeneLookup,
    reader: R,
    organisms: &[&str],
) -> Result<ImportReport, LookupError> {
    let mut report = ImportReport::default();
    let mut chunk = Vec::with_capacity(IMPORT_CHUNK);

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let row = parse_gene_info_line(&line, idx + 1)?;
        if !organisms.is_empty() && !organisms.contains(&row.tax_id.as_str()) {
            report.skipped_organisms += 1;
            continue;
        }
        chunk.push(row);
        if chunk.len() >= IMPORT_CHUNK {
            report.genes += lookup.insert_genes(&chunk)?;
            chunk.clear();
        }
    }
    if !chunk.is_empty() {
        report.genes += lookup.insert_genes(&chunk)?;
    }

    tracing::info!(
        genes = report.genes,
        skipped = report.skipped_organisms,
        "gene_info import finished"
    );
    Ok(report)
}
