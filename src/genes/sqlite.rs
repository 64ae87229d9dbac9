//! SQLite-backed gene database implementing `GeneLookup`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::gene_info::GeneInfoRow;
use super::{Candidate, GeneDetails, GeneLookup, LookupError, MatchSource};
use crate::config::{self, Organism};

/// Local gene database holding any number of organisms.
pub struct SqliteGeneLookup {
    conn: Mutex<Connection>,
}

impl SqliteGeneLookup {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self, LookupError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, LookupError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, LookupError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LookupError> {
        self.conn
            .lock()
            .map_err(|_| LookupError::Unavailable("gene database lock poisoned".into()))
    }

    /// Insert or replace genes, registering their organisms. Runs in one transaction.
    pub fn insert_genes(&self, rows: &[GeneInfoRow]) -> Result<usize, LookupError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for row in rows {
            let name: &str = match config::organism_name(&row.tax_id) {
                Some(name) => name,
                None => &row.tax_id,
            };
            tx.execute(
                "INSERT OR IGNORE INTO organisms (tax_id, name) VALUES (?1, ?2)",
                params![row.tax_id, name],
            )?;
            tx.execute(
                "DELETE FROM gene_aliases WHERE tax_id = ?1 AND ncbi_id = ?2",
                params![row.tax_id, row.ncbi_id as i64],
            )?;
            tx.execute(
                "DELETE FROM genes WHERE tax_id = ?1 AND ncbi_id = ?2",
                params![row.tax_id, row.ncbi_id as i64],
            )?;

            let d = &row.details;
            let synonyms = serde_json::to_string(&d.synonyms)
                .map_err(|e| LookupError::Query(e.to_string()))?;
            let db_refs = serde_json::to_string(&d.db_refs)
                .map_err(|e| LookupError::Query(e.to_string()))?;
            tx.execute(
                "INSERT INTO genes (tax_id, ncbi_id, symbol, locus_tag, chromosome, map_location,
                                    description, type_of_gene, synonyms, db_refs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    row.tax_id,
                    row.ncbi_id as i64,
                    d.symbol,
                    d.locus_tag,
                    d.chromosome,
                    d.map_location,
                    d.description,
                    d.type_of_gene,
                    synonyms,
                    db_refs,
                ],
            )?;

            let insert_alias = |alias: &str, source: MatchSource| {
                tx.execute(
                    "INSERT INTO gene_aliases (tax_id, alias, ncbi_id, source) VALUES (?1, ?2, ?3, ?4)",
                    params![row.tax_id, alias, row.ncbi_id as i64, source.as_str()],
                )
            };
            if let Some(symbol) = d.symbol.as_deref() {
                insert_alias(symbol, MatchSource::Symbol)?;
            }
            for synonym in &d.synonyms {
                insert_alias(synonym, MatchSource::Synonym)?;
            }
            for id in d.db_ref_ids() {
                insert_alias(id, MatchSource::CrossReference)?;
            }
        }

        tx.commit()?;
        Ok(rows.len())
    }

    /// Number of genes stored for an organism.
    pub fn gene_count(&self, organism: &str) -> Result<usize, LookupError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM genes WHERE tax_id = ?1",
            params![organism],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Run all pending migrations
fn run_migrations(conn: &Connection) -> Result<(), LookupError> {
    let current_version: i64 = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i64>>(0)
        })
        .ok()
        .flatten()
        .unwrap_or(0);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_gene_info.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running gene database migration v{version}");
            conn.execute_batch(sql)?;
        }
    }
    Ok(())
}

fn parse_source(s: &str) -> Option<MatchSource> {
    match s {
        "symbol" => Some(MatchSource::Symbol),
        "synonym" => Some(MatchSource::Synonym),
        "cross_reference" => Some(MatchSource::CrossReference),
        _ => None,
    }
}

impl GeneLookup for SqliteGeneLookup {
    fn ping(&self, organism: &str) -> Result<(), LookupError> {
        let conn = self.lock()?;
        let known: Option<String> = conn
            .query_row(
                "SELECT tax_id FROM organisms WHERE tax_id = ?1",
                params![organism],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        match known {
            Some(_) => Ok(()),
            None => Err(LookupError::Unavailable(format!(
                "no gene data for organism {organism}"
            ))),
        }
    }

    fn find_candidates(&self, identifier: &str, organism: &str) -> Result<Vec<Candidate>, LookupError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT ncbi_id, source FROM gene_aliases
             WHERE tax_id = ?1 AND alias = ?2 COLLATE NOCASE
             ORDER BY ncbi_id",
        )?;
        let rows = stmt.query_map(params![organism, identifier.trim()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut candidates = Vec::new();
        for row in rows {
            let (ncbi_id, source) = row?;
            match parse_source(&source) {
                Some(source) => candidates.push(Candidate::new(ncbi_id as u64, source)),
                None => tracing::warn!(source = %source, "Unknown alias source in gene database"),
            }
        }
        Ok(candidates)
    }

    fn load_details(&self, ncbi_id: u64, organism: &str) -> Result<GeneDetails, LookupError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT symbol, locus_tag, chromosome, map_location, description, type_of_gene,
                        synonyms, db_refs
                 FROM genes WHERE tax_id = ?1 AND ncbi_id = ?2",
                params![organism, ncbi_id as i64],
                |row| {
                    Ok((
                        GeneDetails {
                            symbol: row.get(0)?,
                            locus_tag: row.get(1)?,
                            chromosome: row.get(2)?,
                            map_location: row.get(3)?,
                            description: row.get(4)?,
                            type_of_gene: row.get(5)?,
                            ..GeneDetails::default()
                        },
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        let (mut details, synonyms, db_refs) = row.ok_or(LookupError::NotFound { ncbi_id })?;
        details.synonyms =
            serde_json::from_str(&synonyms).map_err(|e| LookupError::Query(e.to_string()))?;
        details.db_refs =
            serde_json::from_str(&db_refs).map_err(|e| LookupError::Query(e.to_string()))?;
        Ok(details)
    }

    fn list_organisms(&self) -> Result<Vec<Organism>, LookupError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT tax_id, name FROM organisms ORDER BY name")?;
        let organisms = stmt
            .query_map([], |row| {
                Ok(Organism {
                    tax_id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(organisms)
    }
}
