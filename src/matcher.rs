//! Cosine matching of a query embedding against the reference store.

use serde::{Deserialize, Serialize};

use crate::embedding::{self, Embedding};
use crate::error::RecognitionError;
use crate::store::{EmployeeRecord, ReferenceStore};

/// Outcome of a match.
///
/// `confidence` always carries the similarity that was measured, even on a
/// miss, so callers can see how close the query came. `employee_id` is only
/// populated when `matched` is true in open search; in targeted mode it
/// echoes the requested id either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub employee_id: Option<String>,
    pub confidence: f32,
    pub matched: bool,
}

/// Score `query` against the store: against one employee when `target` is
/// given, otherwise against everyone with the best score winning.
///
/// Matching is `confidence >= threshold`. Ties in open search keep the
/// earliest-enrolled employee.
pub fn match_query(
    store: &ReferenceStore,
    query: &Embedding,
    threshold: f32,
    target: Option<&str>,
) -> Result<MatchResult, RecognitionError> {
    if store.is_empty() {
        return Err(RecognitionError::EmptyDatabase);
    }

    if let Some(id) = target {
        let record = store
            .get(id)
            .ok_or_else(|| RecognitionError::UnknownEmployee(id.to_string()))?;
        let confidence = embedding::cosine(query, &record.embedding);
        return Ok(MatchResult {
            employee_id: Some(record.id.clone()),
            confidence,
            matched: confidence >= threshold,
        });
    }

    let best = store
        .iter()
        .map(|record| (record, embedding::cosine(query, &record.embedding)))
        .fold(
            None::<(&EmployeeRecord, f32)>,
            |acc, (record, confidence)| match acc {
                Some((_, best)) if best >= confidence => acc,
                _ => Some((record, confidence)),
            },
        );

    // The empty-store case returned above, so a best candidate exists.
    let (record, confidence) = best.ok_or(RecognitionError::EmptyDatabase)?;
    let matched = confidence >= threshold;
    Ok(MatchResult {
        employee_id: matched.then(|| record.id.clone()),
        confidence,
        matched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit vectors with cos(query, v1) = 0.9 and cos(query, v2) = 0.95.
    fn scenario_store() -> (ReferenceStore, Embedding) {
        let query = Embedding::from_raw(vec![1.0, 0.0]).unwrap();
        let v1 = Embedding::from_raw(vec![0.9, (1.0_f32 - 0.81).sqrt()]).unwrap();
        let v2 = Embedding::from_raw(vec![0.95, (1.0_f32 - 0.9025).sqrt()]).unwrap();

        let mut store = ReferenceStore::new();
        store.upsert("E1", v1);
        store.upsert("E2", v2);
        (store, query)
    }

    #[test]
    fn test_open_search_picks_best_over_threshold() {
        let (store, query) = scenario_store();
        let result = match_query(&store, &query, 0.9, None).unwrap();

        assert_eq!(result.employee_id.as_deref(), Some("E2"));
        assert!((result.confidence - 0.95).abs() < 1e-5);
        assert!(result.matched);
    }

    #[test]
    fn test_open_search_miss_still_reports_confidence() {
        let (store, query) = scenario_store();
        let result = match_query(&store, &query, 0.97, None).unwrap();

        assert_eq!(result.employee_id, None);
        assert!((result.confidence - 0.95).abs() < 1e-5);
        assert!(!result.matched);
    }

    #[test]
    fn test_targeted_ignores_better_candidates() {
        let (store, query) = scenario_store();
        let result = match_query(&store, &query, 0.85, Some("E1")).unwrap();

        assert_eq!(result.employee_id.as_deref(), Some("E1"));
        assert!((result.confidence - 0.9).abs() < 1e-5);
        assert!(result.matched);
    }

    #[test]
    fn test_targeted_miss_echoes_id() {
        let (store, query) = scenario_store();
        let result = match_query(&store, &query, 0.95, Some("E1")).unwrap();

        assert_eq!(result.employee_id.as_deref(), Some("E1"));
        assert!(!result.matched);
    }

    #[test]
    fn test_exact_threshold_matches() {
        let (store, query) = scenario_store();
        // cosine(query, E2) lands within float error of 0.95; nudge the
        // threshold just below to pin the >= rule.
        let result = match_query(&store, &query, 0.95 - 1e-6, None).unwrap();
        assert!(result.matched);
    }

    #[test]
    fn test_empty_store_fails_before_anything() {
        let store = ReferenceStore::new();
        let query = Embedding::from_raw(vec![1.0, 0.0]).unwrap();

        assert!(matches!(
            match_query(&store, &query, 0.5, None),
            Err(RecognitionError::EmptyDatabase)
        ));
        assert!(matches!(
            match_query(&store, &query, 0.5, Some("E1")),
            Err(RecognitionError::EmptyDatabase)
        ));
    }

    #[test]
    fn test_unknown_target_fails() {
        let (store, query) = scenario_store();
        let err = match_query(&store, &query, 0.5, Some("E9")).unwrap_err();
        assert!(matches!(err, RecognitionError::UnknownEmployee(id) if id == "E9"));
    }

    #[test]
    fn test_tie_keeps_enrollment_order() {
        let same = Embedding::from_raw(vec![0.6, 0.8]).unwrap();
        let mut store = ReferenceStore::new();
        store.upsert("later", same.clone());
        store.upsert("earlier", same.clone());
        // "later" was enrolled first, so it wins the tie.
        let result = match_query(&store, &same, 0.5, None).unwrap();
        assert_eq!(result.employee_id.as_deref(), Some("later"));
    }
}
