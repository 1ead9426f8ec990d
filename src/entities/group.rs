// SavingsGroup entity - rows of the `grupos_ahorro` table

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// SAVINGS TYPE
// ============================================================================

/// Savings methodology of a group. Every group has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavingsType {
    /// Plain pooled savings, paid out at cycle end
    Simple,
    /// Rotating pot: each meeting one member takes the whole collection
    Rosca,
    /// Accumulating fund that also lends to members during the cycle
    Asca,
}

impl SavingsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavingsType::Simple => "Simple",
            SavingsType::Rosca => "Rosca",
            SavingsType::Asca => "Asca",
        }
    }

    pub fn parse(s: &str) -> Option<SavingsType> {
        match s {
            "Simple" => Some(SavingsType::Simple),
            "Rosca" => Some(SavingsType::Rosca),
            "Asca" => Some(SavingsType::Asca),
            _ => None,
        }
    }
}

// ============================================================================
// SAVINGS GROUP
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsGroup {
    #[serde(default)]
    pub id: i64,

    #[serde(rename = "nombre_grupo")]
    pub name: String,

    #[serde(rename = "pais_operacion")]
    pub country: String,

    #[serde(rename = "ciudad_operacion")]
    pub city: String,

    /// Operating zone, used for coordinator scoping. Nullable in the store.
    #[serde(rename = "zona_operacion")]
    pub zone: Option<String>,

    #[serde(rename = "numero_total_miembros")]
    pub total_members: u32,

    #[serde(rename = "cantidad_hombres")]
    pub men: u32,

    #[serde(rename = "cantidad_mujeres")]
    pub women: u32,

    #[serde(rename = "cantidad_ninos")]
    pub boys: u32,

    #[serde(rename = "cantidad_ninas")]
    pub girls: u32,

    #[serde(rename = "tipo_ahorro")]
    pub savings_type: SavingsType,

    #[serde(rename = "grupo_juvenil")]
    pub youth_group: bool,

    /// Planned cycle length in months
    #[serde(rename = "duracion_ciclo")]
    pub cycle_duration: u32,

    /// Creation period; legacy rows may carry neither. A group with no
    /// creation year never counts as active for any period.
    #[serde(rename = "ano_creacion")]
    pub creation_year: Option<i32>,

    #[serde(rename = "mes_creacion")]
    pub creation_month: Option<u32>,

    #[serde(rename = "facilitador_id")]
    pub facilitator_id: String,
}

impl SavingsGroup {
    /// Whether the group existed as of the target (year, month): its
    /// creation period is on or before the target period.
    pub fn is_active_in(&self, year: i32, month: u32) -> bool {
        match self.creation_year {
            None => false,
            Some(cy) if cy < year => true,
            Some(cy) if cy == year => self.creation_month.unwrap_or(1) <= month,
            Some(_) => false,
        }
    }

    /// Sum of the four demographic counts. Should equal `total_members`;
    /// validation enforces it, the store does not.
    pub fn demographic_total(&self) -> u32 {
        self.men + self.women + self.boys + self.girls
    }

    pub fn children(&self) -> u32 {
        self.boys + self.girls
    }

    /// Hash used to skip exact duplicates on CSV re-import. Covers every
    /// persisted field so that a corrected row (same group, different
    /// counts) is still inserted instead of being dropped as a duplicate.
    /// NOTE: deduplication key, not identity - ids come from the store.
    pub fn compute_idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.name,
            self.country,
            self.city,
            self.zone.as_deref().unwrap_or(""),
            self.total_members,
            self.men,
            self.women,
            self.boys,
            self.girls,
            self.savings_type.as_str(),
            self.youth_group,
            self.cycle_duration,
            self.creation_year.map(|y| y.to_string()).unwrap_or_default(),
            self.creation_month.map(|m| m.to_string()).unwrap_or_default(),
            self.facilitator_id,
        ));
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group() -> SavingsGroup {
        SavingsGroup {
            id: 1,
            name: "Grupo Esperanza".to_string(),
            country: "Colombia".to_string(),
            city: "Barranquilla".to_string(),
            zone: None,
            total_members: 12,
            men: 4,
            women: 6,
            boys: 1,
            girls: 1,
            savings_type: SavingsType::Simple,
            youth_group: false,
            cycle_duration: 12,
            creation_year: Some(2024),
            creation_month: Some(3),
            facilitator_id: "fac-1".to_string(),
        }
    }

    #[test]
    fn test_savings_type_round_trip() {
        for ty in [SavingsType::Simple, SavingsType::Rosca, SavingsType::Asca] {
            assert_eq!(SavingsType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(SavingsType::parse("Mixto"), None);
    }

    #[test]
    fn test_is_active_in() {
        let group = sample_group();

        // Created March 2024
        assert!(group.is_active_in(2024, 3));
        assert!(group.is_active_in(2024, 4));
        assert!(group.is_active_in(2025, 1));
        assert!(!group.is_active_in(2024, 2));
        assert!(!group.is_active_in(2023, 12));
    }

    #[test]
    fn test_missing_creation_year_never_active() {
        let mut group = sample_group();
        group.creation_year = None;
        assert!(!group.is_active_in(2024, 3));
        assert!(!group.is_active_in(2100, 12));
    }

    #[test]
    fn test_missing_creation_month_defaults_to_january() {
        let mut group = sample_group();
        group.creation_month = None;
        assert!(group.is_active_in(2024, 1));
        assert!(!group.is_active_in(2023, 12));
    }

    #[test]
    fn test_demographics() {
        let group = sample_group();
        assert_eq!(group.demographic_total(), 12);
        assert_eq!(group.children(), 2);
    }

    #[test]
    fn test_idempotency_hash_ignores_id() {
        let a = sample_group();
        let mut b = sample_group();
        b.id = 99;
        assert_eq!(a.compute_idempotency_hash(), b.compute_idempotency_hash());

        let mut c = sample_group();
        c.name = "Grupo Nueva Vida".to_string();
        assert_ne!(a.compute_idempotency_hash(), c.compute_idempotency_hash());
    }

    #[test]
    fn test_corrected_counts_get_distinct_hash() {
        let original = sample_group();

        // Same group identity, corrected demographics: must not dedupe.
        let mut corrected = sample_group();
        corrected.women = 7;
        corrected.total_members = 13;
        assert_ne!(
            original.compute_idempotency_hash(),
            corrected.compute_idempotency_hash()
        );

        let mut retyped = sample_group();
        retyped.savings_type = SavingsType::Asca;
        assert_ne!(
            original.compute_idempotency_hash(),
            retyped.compute_idempotency_hash()
        );
    }
}
