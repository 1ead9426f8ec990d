// Cycle entity - rows of the `ciclos_ahorro` table, plus the state
// classification the dashboards show as a badge.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// CYCLE STATUS
// ============================================================================

/// Stored status of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleStatus {
    Active,
    Terminated,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Active => "activo",
            CycleStatus::Terminated => "terminado",
        }
    }

    pub fn parse(s: &str) -> Option<CycleStatus> {
        match s {
            "activo" => Some(CycleStatus::Active),
            "terminado" => Some(CycleStatus::Terminated),
            _ => None,
        }
    }
}

// ============================================================================
// CYCLE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    #[serde(default)]
    pub id: i64,

    #[serde(rename = "grupo_id")]
    pub group_id: i64,

    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(rename = "fecha_inicio")]
    pub start_date: NaiveDate,

    #[serde(rename = "fecha_fin")]
    pub end_date: Option<NaiveDate>,

    #[serde(rename = "estado")]
    pub status: CycleStatus,
}

/// The cycle with the highest id is the group's current cycle.
pub fn latest_cycle(cycles: &[Cycle]) -> Option<&Cycle> {
    cycles.iter().max_by_key(|c| c.id)
}

// ============================================================================
// CYCLE STATE CLASSIFICATION
// ============================================================================

/// Display classification of a group's cycle history.
///
/// Rule: a group with no cycles is `WithoutCycle`; otherwise the latest
/// cycle (highest id) alone decides between `Active` and `Terminated`.
/// The badge therefore always agrees with the date range shown for the
/// current cycle, even when an older cycle was left marked active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleState {
    WithoutCycle,
    Active,
    Terminated,
}

impl CycleState {
    pub fn classify(cycles: &[Cycle]) -> CycleState {
        match latest_cycle(cycles) {
            None => CycleState::WithoutCycle,
            Some(c) if c.status == CycleStatus::Active => CycleState::Active,
            Some(_) => CycleState::Terminated,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CycleState::WithoutCycle => "Sin ciclo",
            CycleState::Active => "Activo",
            CycleState::Terminated => "Terminado",
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(id: i64, status: CycleStatus) -> Cycle {
        Cycle {
            id,
            group_id: 1,
            name: format!("Ciclo {}", id),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            end_date: None,
            status,
        }
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(CycleStatus::parse("activo"), Some(CycleStatus::Active));
        assert_eq!(CycleStatus::parse("terminado"), Some(CycleStatus::Terminated));
        assert_eq!(CycleStatus::parse("pausado"), None);
    }

    #[test]
    fn test_no_cycles_classifies_without_cycle() {
        assert_eq!(CycleState::classify(&[]), CycleState::WithoutCycle);
    }

    #[test]
    fn test_single_active_cycle() {
        let cycles = vec![cycle(1, CycleStatus::Active)];
        assert_eq!(CycleState::classify(&cycles), CycleState::Active);
    }

    #[test]
    fn test_latest_cycle_rule_governs() {
        // Older cycle still marked active, newest terminated: the latest
        // cycle decides, so the group classifies as terminated.
        let cycles = vec![cycle(1, CycleStatus::Active), cycle(2, CycleStatus::Terminated)];
        assert_eq!(CycleState::classify(&cycles), CycleState::Terminated);

        // And the other way around.
        let cycles = vec![cycle(1, CycleStatus::Terminated), cycle(2, CycleStatus::Active)];
        assert_eq!(CycleState::classify(&cycles), CycleState::Active);
    }

    #[test]
    fn test_latest_cycle_ignores_ordering() {
        let cycles = vec![cycle(3, CycleStatus::Terminated), cycle(1, CycleStatus::Active)];
        assert_eq!(latest_cycle(&cycles).unwrap().id, 3);
        assert_eq!(CycleState::classify(&cycles), CycleState::Terminated);
    }
}
