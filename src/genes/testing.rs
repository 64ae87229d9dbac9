//! In-memory `GeneLookup` test double.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{Candidate, GeneDetails, GeneLookup, LookupError, MatchSource};
use crate::config::Organism;

pub struct StaticGeneLookup {
    organism: String,
    genes: Vec<(u64, GeneDetails)>,
    unavailable: AtomicBool,
    failing: Mutex<HashSet<String>>,
    /// Identifier after which the service goes away mid-run.
    drop_after: Mutex<Option<String>>,
    delay: Duration,
    queries: AtomicUsize,
    detail_loads: AtomicUsize,
}

fn gene(symbol: &str, synonyms: &[&str], refs: &[(&str, &str)]) -> GeneDetails {
    GeneDetails {
        symbol: Some(symbol.to_string()),
        synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        db_refs: refs
            .iter()
            .map(|(db, id)| (db.to_string(), vec![id.to_string()]))
            .collect::<BTreeMap<_, _>>(),
        description: Some(format!("{symbol} test gene")),
        type_of_gene: Some("protein-coding".to_string()),
        chromosome: Some("17".to_string()),
        ..GeneDetails::default()
    }
}

impl StaticGeneLookup {
    /// A handful of human genes, including a synonym (`AMB`) shared by two genes
    /// and a gene without a symbol.
    pub fn human() -> Self {
        Self::new(
            "9606",
            vec![
                (7157, gene("TP53", &["P53", "LFS1"], &[("HGNC", "HGNC:11998")])),
                (672, gene("BRCA1", &["BRCAI", "RNF53"], &[("HGNC", "HGNC:1100")])),
                (920, gene("CD4", &["CD4mut"], &[("Ensembl", "ENSG00000010610")])),
                (200, gene("GENEB", &["AMB"], &[])),
                (100, gene("GENEA", &["AMB"], &[])),
                (
                    999,
                    GeneDetails {
                        symbol: None,
                        synonyms: vec!["NOSYM".to_string()],
                        ..GeneDetails::default()
                    },
                ),
            ],
        )
    }

    pub fn new(organism: &str, genes: Vec<(u64, GeneDetails)>) -> Self {
        Self {
            organism: organism.to_string(),
            genes,
            unavailable: AtomicBool::new(false),
            failing: Mutex::new(HashSet::new()),
            drop_after: Mutex::new(None),
            delay: Duration::ZERO,
            queries: AtomicUsize::new(0),
            detail_loads: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make queries for `identifier` fail with a per-query error.
    pub fn fail_on(&self, identifier: &str) {
        self.failing.lock().unwrap().insert(identifier.to_string());
    }

    /// Become unavailable once `identifier` has been queried.
    pub fn drop_after(&self, identifier: &str) {
        *self.drop_after.lock().unwrap() = Some(identifier.to_string());
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn detail_loads(&self) -> usize {
        self.detail_loads.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), LookupError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LookupError::Unavailable("test service offline".into()));
        }
        Ok(())
    }
}

impl GeneLookup for StaticGeneLookup {
    fn ping(&self, organism: &str) -> Result<(), LookupError> {
        self.check_available()?;
        if organism != self.organism {
            return Err(LookupError::Unavailable(format!("no genes for {organism}")));
        }
        Ok(())
    }

    fn find_candidates(&self, identifier: &str, organism: &str) -> Result<Vec<Candidate>, LookupError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.check_available()?;
        self.queries.fetch_add(1, Ordering::SeqCst);

        if self
            .drop_after
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|id| id == identifier)
        {
            self.set_unavailable(true);
        }
        if self.failing.lock().unwrap().contains(identifier) {
            return Err(LookupError::Query(format!("lookup of {identifier} failed")));
        }
        if organism != self.organism {
            return Ok(vec![]);
        }

        let mut candidates = Vec::new();
        for (id, details) in &self.genes {
            if details
                .symbol
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(identifier))
            {
                candidates.push(Candidate::new(*id, MatchSource::Symbol));
            }
            if details.synonyms.iter().any(|s| s.eq_ignore_ascii_case(identifier)) {
                candidates.push(Candidate::new(*id, MatchSource::Synonym));
            }
            if details.db_ref_ids().any(|r| r.eq_ignore_ascii_case(identifier)) {
                candidates.push(Candidate::new(*id, MatchSource::CrossReference));
            }
        }
        Ok(candidates)
    }

    fn load_details(&self, ncbi_id: u64, _organism: &str) -> Result<GeneDetails, LookupError> {
        self.check_available()?;
        self.detail_loads.fetch_add(1, Ordering::SeqCst);
        self.genes
            .iter()
            .find(|(id, _)| *id == ncbi_id)
            .map(|(_, d)| d.clone())
            .ok_or(LookupError::NotFound { ncbi_id })
    }

    fn list_organisms(&self) -> Result<Vec<Organism>, LookupError> {
        self.check_available()?;
        Ok(vec![Organism {
            tax_id: self.organism.clone(),
            name: "Homo sapiens".to_string(),
        }])
    }
}
