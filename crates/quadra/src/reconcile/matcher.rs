use serde::{Deserialize, Serialize};

use super::tolerance::Tolerance;
use crate::record::Matchable;

/// One source paired with one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub source_id: String,
    pub candidate_id: String,
    /// `|source| - |candidate|` in cents.
    pub delta_cents: i64,
    /// `source.date - candidate.date` in days.
    pub date_offset_days: i64,
}

/// Greedy single pass: each source, in order, takes the first unclaimed
/// candidate within tolerance. A claimed candidate is never reconsidered.
/// Records lacking an amount or a date never match.
pub fn reconcile<S, C>(sources: &[S], candidates: &[C], tolerance: &Tolerance) -> Vec<MatchResult>
where
    S: Matchable,
    C: Matchable,
{
    let mut claimed = vec![false; candidates.len()];
    let mut matches = Vec::new();

    for source in sources {
        let (Some(src_amount), Some(src_date)) = (source.amount(), source.date()) else {
            continue;
        };

        for (ci, candidate) in candidates.iter().enumerate() {
            if claimed[ci] {
                continue;
            }
            let (Some(cand_amount), Some(cand_date)) = (candidate.amount(), candidate.date()) else {
                continue;
            };

            let delta_cents = src_amount.abs().cents() - cand_amount.abs().cents();
            let date_offset_days = (src_date - cand_date).num_days();

            if tolerance.amount.accepts(src_amount, delta_cents.abs())
                && date_offset_days.unsigned_abs() <= u64::from(tolerance.date_window_days)
            {
                claimed[ci] = true;
                matches.push(MatchResult {
                    source_id: source.record_id().to_string(),
                    candidate_id: candidate.record_id().to_string(),
                    delta_cents,
                    date_offset_days,
                });
                break;
            }
        }
    }

    matches
}
