//! Synchronous match run: resolves every identifier of a request in order.
//!
//! Runs on the calling thread; `task::spawn_match` moves it to the blocking pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::error::MatchError;
use super::ranking::{rank_candidates, Ranking};
use super::types::*;
use crate::genes::{GeneLookup, GeneRecord, LookupError};

/// Progress callback: `(completed, total)`.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Match `identifiers` against `organism` on the current thread.
pub fn match_identifiers(
    lookup: &dyn GeneLookup,
    identifiers: &[String],
    organism: &str,
) -> Result<MatchRun, MatchError> {
    let request = MatchRequest::new(organism, identifiers.to_vec());
    run_match(lookup, &request, None, &AtomicBool::new(false))
}

/// Resolve every identifier of `request`.
///
/// Emits `progress(completed, total)` after each identifier. Checks `cancel`
/// before each lookup. Repeated identifiers (case-insensitive) are looked up
/// once and share the same `GeneRecord`.
pub fn run_match(
    lookup: &dyn GeneLookup,
    request: &MatchRequest,
    progress: Option<ProgressFn<'_>>,
    cancel: &AtomicBool,
) -> Result<MatchRun, MatchError> {
    let started_at = Utc::now();
    let total = request.identifiers.len();

    if total == 0 {
        return Err(MatchError::ExtractionEmpty);
    }

    lookup
        .ping(&request.organism)
        .map_err(|e| MatchError::LookupUnavailable(e.to_string()))?;

    tracing::info!(
        run_id = %request.run_id,
        organism = %request.organism,
        total,
        "Gene match run started"
    );

    let mut rankings: HashMap<String, Ranking> = HashMap::new();
    let mut records: HashMap<u64, Arc<GeneRecord>> = HashMap::new();
    let mut results = Vec::with_capacity(total);

    for (idx, identifier) in request.identifiers.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            tracing::debug!(run_id = %request.run_id, completed = idx, "Gene match run cancelled");
            return Err(MatchError::Cancelled);
        }

        let key = identifier.trim().to_lowercase();
        let ranking = match rankings.get(&key) {
            Some(ranking) => ranking.clone(),
            None => {
                let ranking = resolve(lookup, identifier, &request.organism)?;
                rankings.insert(key, ranking.clone());
                ranking
            }
        };

        let gene = ranking.chosen().map(|ncbi_id| {
            records
                .entry(ncbi_id)
                .or_insert_with(|| Arc::new(GeneRecord::new(ncbi_id, request.organism.clone())))
                .clone()
        });

        results.push(MatchResult {
            input_name: identifier.clone(),
            gene,
            classification: ranking.classification,
            candidates: ranking.ids(),
        });

        if let Some(progress) = progress {
            progress(idx + 1, total);
        }
    }

    let run = MatchRun {
        run_id: request.run_id,
        organism: request.organism.clone(),
        results,
        started_at,
        finished_at: Utc::now(),
    };

    tracing::info!(
        run_id = %run.run_id,
        known = run.known(),
        total = run.total(),
        duration_ms = run.duration_ms(),
        "Gene match run completed"
    );

    Ok(run)
}

/// Look up and rank one identifier.
///
/// A failed query downgrades the identifier to unknown. Losing the service
/// entirely fails the run.
fn resolve(lookup: &dyn GeneLookup, identifier: &str, organism: &str) -> Result<Ranking, MatchError> {
    let query = identifier.trim();
    if query.is_empty() {
        return Ok(rank_candidates(&[]));
    }

    match lookup.find_candidates(query, organism) {
        Ok(candidates) => Ok(rank_candidates(&candidates)),
        Err(LookupError::Unavailable(reason)) => Err(MatchError::LookupUnavailable(reason)),
        Err(e) => {
            tracing::warn!(
                identifier = query,
                organism,
                error = %e,
                "Gene lookup failed, treating identifier as unknown"
            );
            Ok(rank_candidates(&[]))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::genes::testing::StaticGeneLookup;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn attribute_names_resolve_known_genes() {
        let lookup = StaticGeneLookup::human();
        let run = match_identifiers(&lookup, &ids(&["BRCA1", "FAKE123", "TP53"]), "9606").unwrap();

        assert_eq!(run.total(), 3);
        assert_eq!(run.known(), 2);
        let classes: Vec<Classification> = run.results.iter().map(|r| r.classification).collect();
        assert_eq!(
            classes,
            vec![Classification::Unique, Classification::Unknown, Classification::Unique]
        );
        assert_eq!(run.results[0].ncbi_id(), Some(672));
        assert_eq!(run.results[2].ncbi_id(), Some(7157));
    }

    #[test]
    fn results_follow_input_order() {
        let lookup = StaticGeneLookup::human();
        let input = ids(&["TP53", "x", "brca1", "TP53", ""]);
        let run = match_identifiers(&lookup, &input, "9606").unwrap();
        let names: Vec<&str> = run.results.iter().map(|r| r.input_name.as_str()).collect();
        assert_eq!(names, vec!["TP53", "x", "brca1", "TP53", ""]);
        assert_eq!(run.known() + run.unknown(), input.len());
        assert_eq!(run.results[4].classification, Classification::Unknown);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let lookup = StaticGeneLookup::human();
        let run = match_identifiers(&lookup, &ids(&["tp53", "lfs1"]), "9606").unwrap();
        assert_eq!(run.results[0].ncbi_id(), Some(7157));
        assert_eq!(run.results[1].ncbi_id(), Some(7157));
    }

    #[test]
    fn ambiguous_synonym_is_partial() {
        let lookup = StaticGeneLookup::human();
        let run = match_identifiers(&lookup, &ids(&["AMB"]), "9606").unwrap();
        let result = &run.results[0];
        assert_eq!(result.classification, Classification::Partial);
        assert_eq!(result.ncbi_id(), Some(100));
        assert_eq!(result.candidates, vec![100, 200]);
    }

    #[test]
    fn repeated_identifiers_share_record() {
        let lookup = StaticGeneLookup::human();
        let run = match_identifiers(&lookup, &ids(&["TP53", "tp53", "P53"]), "9606").unwrap();
        assert_eq!(lookup.queries(), 2);
        let a = run.results[0].gene.as_ref().unwrap();
        let c = run.results[2].gene.as_ref().unwrap();
        assert!(Arc::ptr_eq(a, c));
    }

    #[test]
    fn details_are_not_loaded_during_match() {
        let lookup = StaticGeneLookup::human();
        let run = match_identifiers(&lookup, &ids(&["TP53"]), "9606").unwrap();
        assert_eq!(lookup.detail_loads(), 0);
        assert!(!run.results[0].gene.as_ref().unwrap().is_loaded());
    }

    #[test]
    fn query_failure_degrades_to_unknown() {
        let lookup = StaticGeneLookup::human();
        lookup.fail_on("TP53");
        let run = match_identifiers(&lookup, &ids(&["TP53", "BRCA1"]), "9606").unwrap();
        assert_eq!(run.results[0].classification, Classification::Unknown);
        assert_eq!(run.results[1].classification, Classification::Unique);
    }

    #[test]
    fn unavailable_service_fails_run() {
        let lookup = StaticGeneLookup::human();
        lookup.set_unavailable(true);
        let err = match_identifiers(&lookup, &ids(&["TP53"]), "9606").unwrap_err();
        assert!(matches!(err, MatchError::LookupUnavailable(_)));
        assert_eq!(lookup.queries(), 0);
    }

    #[test]
    fn service_lost_mid_run_fails_run() {
        let lookup = StaticGeneLookup::human();
        lookup.drop_after("TP53");
        let err = match_identifiers(&lookup, &ids(&["TP53", "BRCA1"]), "9606").unwrap_err();
        assert!(matches!(err, MatchError::LookupUnavailable(_)));
    }

    #[test]
    fn unknown_organism_is_unavailable() {
        let lookup = StaticGeneLookup::human();
        let err = match_identifiers(&lookup, &ids(&["TP53"]), "10090").unwrap_err();
        assert!(matches!(err, MatchError::LookupUnavailable(_)));
    }

    #[test]
    fn empty_input_is_rejected() {
        let lookup = StaticGeneLookup::human();
        let err = match_identifiers(&lookup, &[], "9606").unwrap_err();
        assert!(matches!(err, MatchError::ExtractionEmpty));
    }

    #[test]
    fn progress_counts_up_to_total() {
        let lookup = StaticGeneLookup::human();
        let seen = Mutex::new(Vec::new());
        let record = |done: usize, total: usize| seen.lock().unwrap().push((done, total));
        let request = MatchRequest::new("9606", ids(&["TP53", "BRCA1", "nope"]));
        run_match(&lookup, &request, Some(&record), &AtomicBool::new(false)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn cancelled_before_start() {
        let lookup = StaticGeneLookup::human();
        let request = MatchRequest::new("9606", ids(&["TP53"]));
        let err = run_match(&lookup, &request, None, &AtomicBool::new(true)).unwrap_err();
        assert!(matches!(err, MatchError::Cancelled));
        assert_eq!(lookup.queries(), 0);
    }

    #[test]
    fn run_keeps_request_identity() {
        let lookup = StaticGeneLookup::human();
        let request = MatchRequest::new("9606", ids(&["TP53"]));
        let run = run_match(&lookup, &request, None, &AtomicBool::new(false)).unwrap();
        assert_eq!(run.run_id, request.run_id);
        assert_eq!(run.organism, "9606");
        assert!(run.finished_at >= run.started_at);
    }
}
