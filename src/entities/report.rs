// MonthlyReport entity - rows of the `reportes_grupos` table
//
// No uniqueness per (group, year, month): amendments arrive as new rows
// and aggregation sums everything that matches the period.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyReport {
    #[serde(default)]
    pub id: i64,

    #[serde(rename = "grupo_id")]
    pub group_id: i64,

    #[serde(rename = "facilitador_id")]
    pub facilitator_id: String,

    #[serde(rename = "ano")]
    pub year: i32,

    /// 1..=12
    #[serde(rename = "mes")]
    pub month: u32,

    #[serde(rename = "numero_reuniones")]
    pub meeting_count: u32,

    #[serde(rename = "promedio_asistencia")]
    pub average_attendance: Option<f64>,

    #[serde(rename = "cantidad_ahorrada")]
    pub amount_saved: f64,

    #[serde(rename = "comentarios")]
    pub comments: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl MonthlyReport {
    pub fn is_for(&self, year: i32, month: u32) -> bool {
        self.year == year && self.month == month
    }

    /// Hash used to skip exact duplicates on CSV re-import. Covers every
    /// reported value so that a genuine amendment (same period, different
    /// figures) is still inserted as a new row.
    pub fn compute_idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.group_id,
            self.facilitator_id,
            self.year,
            self.month,
            self.meeting_count,
            self.average_attendance.unwrap_or(0.0),
            self.amount_saved,
            self.comments.as_deref().unwrap_or(""),
        ));
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> MonthlyReport {
        MonthlyReport {
            id: 1,
            group_id: 7,
            facilitator_id: "fac-1".to_string(),
            year: 2024,
            month: 3,
            meeting_count: 4,
            average_attendance: Some(10.0),
            amount_saved: 150.0,
            comments: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_for() {
        let report = sample_report();
        assert!(report.is_for(2024, 3));
        assert!(!report.is_for(2024, 4));
        assert!(!report.is_for(2023, 3));
    }

    #[test]
    fn test_amendment_gets_distinct_hash() {
        let original = sample_report();
        let mut amendment = sample_report();
        amendment.amount_saved = 175.0;

        // Same period, different figures: both rows must survive import.
        assert_ne!(
            original.compute_idempotency_hash(),
            amendment.compute_idempotency_hash()
        );

        // An exact re-read of the same row hashes identically.
        let mut copy = sample_report();
        copy.id = 99;
        assert_eq!(
            original.compute_idempotency_hash(),
            copy.compute_idempotency_hash()
        );
    }

    #[test]
    fn test_facilitator_change_gets_distinct_hash() {
        let original = sample_report();
        let mut reassigned = sample_report();
        reassigned.facilitator_id = "fac-otro".to_string();
        assert_ne!(
            original.compute_idempotency_hash(),
            reassigned.compute_idempotency_hash()
        );
    }
}
