// User entity - rows of the `usuarios` table
//
// Identity comes from the external auth provider (UUID string); the store
// never generates user ids itself.

use serde::{Deserialize, Serialize};

// ============================================================================
// ROLE
// ============================================================================

/// Program role, stored as the Spanish literal the original database uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Creates and manages savings groups and their monthly reports
    Facilitator,
    /// Views aggregated facilitator/group statistics within a zone
    Coordinator,
    /// Views country-level statistics, including exportable summaries
    Director,
    /// Joins a group's active cycle and records personal contributions
    Saver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Facilitator => "facilitador",
            Role::Coordinator => "coordinador",
            Role::Director => "director",
            Role::Saver => "ahorrador",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "facilitador" => Some(Role::Facilitator),
            "coordinador" => Some(Role::Coordinator),
            "director" => Some(Role::Director),
            "ahorrador" => Some(Role::Saver),
            _ => None,
        }
    }
}

// ============================================================================
// USER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    #[serde(rename = "nombre")]
    pub first_name: String,

    #[serde(rename = "apellido")]
    pub last_name: String,

    #[serde(rename = "rol")]
    pub role: Role,

    /// Residence country; directors aggregate over this value
    #[serde(rename = "pais_residencia")]
    pub country: Option<String>,

    /// Operating zone; coordinators aggregate over this value
    #[serde(rename = "zona")]
    pub zone: Option<String>,
}

impl User {
    pub fn new(first_name: &str, last_name: &str, role: Role) -> Self {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role,
            country: None,
            zone: None,
        }
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    pub fn with_zone(mut self, zone: &str) -> Self {
        self.zone = Some(zone.to_string());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Facilitator, Role::Coordinator, Role::Director, Role::Saver] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("administrador"), None);
    }

    #[test]
    fn test_full_name() {
        let user = User::new("Marta", "Rojas", Role::Director).with_country("Colombia");
        assert_eq!(user.full_name(), "Marta Rojas");
        assert_eq!(user.country.as_deref(), Some("Colombia"));
    }
}
