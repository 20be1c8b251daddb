use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use bindery_core::key::Key;

/// Machine-readable summary of one completion pass
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub pass_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub fixture: String,
    /// Statements the author made in `configure_test`
    pub explicit_bindings: usize,
    /// Keys with an explicit or synthesized binding at the end of the pass
    pub observed_keys: usize,
    /// Keys some injection point or hook required
    pub needed_keys: usize,
    /// Concrete keys bound as real singletons, sorted
    pub synthesized_singletons: Vec<String>,
    /// Keys bound as mock singletons, sorted
    pub synthesized_mocks: Vec<String>,
}

impl CompletionReport {
    pub(crate) fn new(
        fixture: &str,
        explicit_bindings: usize,
        observed_keys: usize,
        needed_keys: usize,
        synthesized_singletons: &[Key],
        synthesized_mocks: &[Key],
    ) -> Self {
        let mut singletons: Vec<String> = synthesized_singletons
            .iter()
            .map(|key| key.to_string())
            .collect();
        singletons.sort();
        let mut mocks: Vec<String> = synthesized_mocks
            .iter()
            .map(|key| key.to_string())
            .collect();
        mocks.sort();

        Self {
            pass_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            fixture: fixture.to_string(),
            explicit_bindings,
            observed_keys,
            needed_keys,
            synthesized_singletons: singletons,
            synthesized_mocks: mocks,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ledger;

    #[test]
    fn report_sorts_keys_and_serializes() {
        let report = CompletionReport::new(
            "LedgerFixture",
            2,
            5,
            4,
            &[Key::named::<Ledger>("b"), Key::named::<Ledger>("a")],
            &[],
        );

        assert_eq!(report.fixture, "LedgerFixture");
        assert!(report.synthesized_singletons[0] < report.synthesized_singletons[1]);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"explicit_bindings\": 2"));
        assert!(json.contains("LedgerFixture"));
    }
}
