use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::screening::result::ScreeningResult;

pub const UNKNOWN_CANDIDATE: &str = "Unknown";

/// One completed screening. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub candidate_name: String,
    pub overall_score: u32,
    pub created_at: DateTime<Utc>,
    pub result: ScreeningResult,
}

/// Append-only, in-memory record of completed screenings.
#[derive(Debug, Default)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
    next_seq: u64,
}

impl HistoryLedger {
    /// Builds an entry for `result` and appends it. Missing name and score
    /// are recorded as `"Unknown"` and `0`; the untouched result is kept
    /// alongside.
    pub fn record(&mut self, result: ScreeningResult, created_at: DateTime<Utc>) -> &HistoryEntry {
        self.next_seq += 1;
        let entry = HistoryEntry {
            id: format!("{}-{}", created_at.timestamp_millis(), self.next_seq),
            candidate_name: result
                .candidate_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_CANDIDATE.to_string()),
            overall_score: result.overall_score.unwrap_or(0),
            created_at,
            result,
        };
        self.append(entry)
    }

    pub fn append(&mut self, entry: HistoryEntry) -> &HistoryEntry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Newest first.
    pub fn list(&self) -> Vec<HistoryEntry> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: Option<&str>, score: Option<u32>) -> ScreeningResult {
        ScreeningResult {
            candidate_name: name.map(String::from),
            fit_status: Some("fit".to_string()),
            overall_score: score,
            ..Default::default()
        }
    }

    #[test]
    fn test_list_is_newest_first() {
        let mut ledger = HistoryLedger::default();
        let now = Utc::now();
        ledger.record(result(Some("First"), Some(50)), now);
        ledger.record(result(Some("Second"), Some(60)), now);
        ledger.record(result(Some("Third"), Some(70)), now);

        let names: Vec<_> = ledger.list().into_iter().map(|e| e.candidate_name).collect();
        assert_eq!(names, vec!["Third", "Second", "First"]);
    }

    #[test]
    fn test_ids_are_unique_within_the_same_millisecond() {
        let mut ledger = HistoryLedger::default();
        let now = Utc::now();
        let a = ledger.record(result(Some("A"), None), now).id.clone();
        let b = ledger.record(result(Some("B"), None), now).id.clone();
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_name_and_score_use_defaults() {
        let mut ledger = HistoryLedger::default();
        let entry = ledger.record(result(None, None), Utc::now());
        assert_eq!(entry.candidate_name, "Unknown");
        assert_eq!(entry.overall_score, 0);
        assert_eq!(entry.result.candidate_name, None);
    }

    #[test]
    fn test_get_finds_by_id() {
        let mut ledger = HistoryLedger::default();
        let id = ledger.record(result(Some("Jane"), Some(87)), Utc::now()).id.clone();
        assert_eq!(ledger.get(&id).unwrap().overall_score, 87);
        assert!(ledger.get("missing").is_none());
        assert_eq!(ledger.count(), 1);
    }
}
