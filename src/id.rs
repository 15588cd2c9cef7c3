//! ID and numeric helpers for Cadence
//!
//! Schedule ids are derived from the concept id, so scheduling the same
//! concept twice always lands on the same record.

use sha2::{Digest, Sha256};

/// Prefix mixed into every schedule id hash
const SCHEDULE_ID_NAMESPACE: &str = "review_schedule:";

/// Derive the schedule id for a concept
///
/// Format: first 16 bytes of `sha256("review_schedule:" + concept_id)` as hex
/// Example: `schedule_id_for("rust-ownership")` -> 32 lowercase hex chars
pub fn schedule_id_for(concept_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(SCHEDULE_ID_NAMESPACE.as_bytes());
    hasher.update(concept_id.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_id_is_deterministic() {
        assert_eq!(schedule_id_for("concept-1"), schedule_id_for("concept-1"));
    }

    #[test]
    fn test_schedule_id_differs_per_concept() {
        assert_ne!(schedule_id_for("concept-1"), schedule_id_for("concept-2"));
    }

    #[test]
    fn test_schedule_id_format() {
        let id = schedule_id_for("anything");
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(2.345_678), 2.35);
        assert_eq!(round2(1.3), 1.3);
        assert_eq!(round2(2.5 - 0.15), 2.35);
    }
}
