// Saver-side entities: cycle participation (`participantes_ciclo`) and
// per-meeting savings movements (`movimientos_ahorro`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// PARTICIPANT
// ============================================================================

/// A saver's membership in one cycle, with their personal goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "ciclo_id")]
    pub cycle_id: i64,

    #[serde(rename = "usuario_id")]
    pub user_id: String,

    #[serde(rename = "proposito")]
    pub purpose: String,

    #[serde(rename = "meta_ahorro")]
    pub savings_goal: f64,
}

impl Participant {
    /// Fraction of the personal goal covered by `saved`, clamped to 1.0.
    /// A zero goal reports full progress as soon as anything is saved.
    pub fn goal_progress(&self, saved: f64) -> f64 {
        if self.savings_goal <= 0.0 {
            if saved > 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            (saved / self.savings_goal).min(1.0)
        }
    }
}

// ============================================================================
// MOVEMENT
// ============================================================================

/// A single recorded contribution by a saver within a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    #[serde(default)]
    pub id: i64,

    #[serde(rename = "ciclo_id")]
    pub cycle_id: i64,

    #[serde(rename = "usuario_id")]
    pub user_id: String,

    #[serde(rename = "fecha")]
    pub date: NaiveDate,

    #[serde(rename = "monto")]
    pub amount: f64,

    #[serde(rename = "nota")]
    pub note: Option<String>,
}

/// Total contributed across a saver's movements.
pub fn personal_total(movements: &[Movement]) -> f64 {
    movements.iter().map(|m| m.amount).sum()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(id: i64, amount: f64) -> Movement {
        Movement {
            id,
            cycle_id: 1,
            user_id: "saver-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            amount,
            note: None,
        }
    }

    #[test]
    fn test_personal_total() {
        let movements = vec![movement(1, 10.0), movement(2, 15.5), movement(3, 0.0)];
        assert_eq!(personal_total(&movements), 25.5);
        assert_eq!(personal_total(&[]), 0.0);
    }

    #[test]
    fn test_goal_progress() {
        let participant = Participant {
            cycle_id: 1,
            user_id: "saver-1".to_string(),
            purpose: "Comprar herramientas".to_string(),
            savings_goal: 200.0,
        };

        assert_eq!(participant.goal_progress(0.0), 0.0);
        assert_eq!(participant.goal_progress(50.0), 0.25);
        assert_eq!(participant.goal_progress(400.0), 1.0);
    }

    #[test]
    fn test_goal_progress_zero_goal() {
        let participant = Participant {
            cycle_id: 1,
            user_id: "saver-1".to_string(),
            purpose: String::new(),
            savings_goal: 0.0,
        };

        assert_eq!(participant.goal_progress(0.0), 0.0);
        assert_eq!(participant.goal_progress(1.0), 1.0);
    }
}
