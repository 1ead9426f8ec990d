// Form Validation
//
// Mirrors the client-side form schemas: every write is validated first and
// blocked with field-level messages when anything fails. The store itself
// enforces none of these rules.

use crate::entities::{Cycle, MonthlyReport, Movement, Participant, SavingsGroup};

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    fn new(context: &str, field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
            context: context.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// ============================================================================
// GROUP FORM
// ============================================================================

pub fn validate_group(group: &SavingsGroup) -> ValidationResult {
    let ctx = "SavingsGroup";
    let mut errors = Vec::new();

    if group.name.trim().len() < 3 {
        errors.push(ValidationError::new(
            ctx,
            "nombre_grupo",
            "El nombre debe tener al menos 3 caracteres",
        ));
    }

    if group.country.trim().is_empty() {
        errors.push(ValidationError::new(ctx, "pais_operacion", "El país es requerido"));
    }

    if group.city.trim().is_empty() {
        errors.push(ValidationError::new(ctx, "ciudad_operacion", "La ciudad es requerida"));
    }

    if group.cycle_duration < 1 {
        errors.push(ValidationError::new(
            ctx,
            "duracion_ciclo",
            "La duración debe ser al menos 1 mes",
        ));
    }

    match group.creation_year {
        Some(year) if !(2000..=2100).contains(&year) => {
            errors.push(ValidationError::new(
                ctx,
                "ano_creacion",
                format!("Debe estar entre 2000 y 2100, se recibió {}", year),
            ));
        }
        _ => {}
    }

    match group.creation_month {
        Some(month) if !(1..=12).contains(&month) => {
            errors.push(ValidationError::new(
                ctx,
                "mes_creacion",
                format!("Debe estar entre 1 y 12, se recibió {}", month),
            ));
        }
        _ => {}
    }

    // The form auto-calculates the total from the four counts; a mismatch
    // means the row was built outside the form.
    if group.total_members != group.demographic_total() {
        errors.push(ValidationError::new(
            ctx,
            "numero_total_miembros",
            format!(
                "Debe ser igual a la suma demográfica ({}), se recibió {}",
                group.demographic_total(),
                group.total_members
            ),
        ));
    }

    if group.facilitator_id.trim().is_empty() {
        errors.push(ValidationError::new(ctx, "facilitador_id", "Campo requerido vacío"));
    }

    finish(errors)
}

// ============================================================================
// REPORT FORM
// ============================================================================

pub fn validate_report(report: &MonthlyReport) -> ValidationResult {
    let ctx = "MonthlyReport";
    let mut errors = Vec::new();

    if !(1..=12).contains(&report.month) {
        errors.push(ValidationError::new(
            ctx,
            "mes",
            format!("Debe estar entre 1 y 12, se recibió {}", report.month),
        ));
    }

    if !(2000..=2100).contains(&report.year) {
        errors.push(ValidationError::new(
            ctx,
            "ano",
            format!("Debe estar entre 2000 y 2100, se recibió {}", report.year),
        ));
    }

    if report.amount_saved < 0.0 {
        errors.push(ValidationError::new(
            ctx,
            "cantidad_ahorrada",
            "La cantidad no puede ser negativa",
        ));
    }

    if let Some(attendance) = report.average_attendance {
        if attendance < 0.0 {
            errors.push(ValidationError::new(
                ctx,
                "promedio_asistencia",
                "El promedio no puede ser negativo",
            ));
        }
    }

    if report.facilitator_id.trim().is_empty() {
        errors.push(ValidationError::new(ctx, "facilitador_id", "Campo requerido vacío"));
    }

    finish(errors)
}

// ============================================================================
// CYCLE FORM
// ============================================================================

pub fn validate_cycle(cycle: &Cycle) -> ValidationResult {
    let ctx = "Cycle";
    let mut errors = Vec::new();

    if cycle.name.trim().is_empty() {
        errors.push(ValidationError::new(ctx, "nombre", "El nombre es requerido"));
    }

    if let Some(end) = cycle.end_date {
        if end < cycle.start_date {
            errors.push(ValidationError::new(
                ctx,
                "fecha_fin",
                "La fecha de fin no puede ser anterior a la de inicio",
            ));
        }
    }

    finish(errors)
}

// ============================================================================
// SAVER FORMS
// ============================================================================

pub fn validate_movement(movement: &Movement) -> ValidationResult {
    let ctx = "Movement";
    let mut errors = Vec::new();

    if movement.amount < 0.0 {
        errors.push(ValidationError::new(ctx, "monto", "El monto no puede ser negativo"));
    }

    if movement.user_id.trim().is_empty() {
        errors.push(ValidationError::new(ctx, "usuario_id", "Campo requerido vacío"));
    }

    finish(errors)
}

pub fn validate_participant(participant: &Participant) -> ValidationResult {
    let ctx = "Participant";
    let mut errors = Vec::new();

    if participant.user_id.trim().is_empty() {
        errors.push(ValidationError::new(ctx, "usuario_id", "Campo requerido vacío"));
    }

    if participant.savings_goal < 0.0 {
        errors.push(ValidationError::new(
            ctx,
            "meta_ahorro",
            "La meta no puede ser negativa",
        ));
    }

    finish(errors)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CycleStatus, SavingsType};
    use chrono::{NaiveDate, Utc};

    fn valid_group() -> SavingsGroup {
        SavingsGroup {
            id: 0,
            name: "Grupo Esperanza".to_string(),
            country: "Colombia".to_string(),
            city: "Barranquilla".to_string(),
            zone: None,
            total_members: 10,
            men: 3,
            women: 5,
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

    fn valid_report() -> MonthlyReport {
        MonthlyReport {
            id: 0,
            group_id: 1,
            facilitator_id: "fac-1".to_string(),
            year: 2024,
            month: 3,
            meeting_count: 4,
            average_attendance: Some(8.5),
            amount_saved: 120.0,
            comments: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_group_passes() {
        assert!(validate_group(&valid_group()).is_ok());
    }

    #[test]
    fn test_group_short_name_rejected() {
        let mut group = valid_group();
        group.name = "GE".to_string();

        let errors = validate_group(&group).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "nombre_grupo"));
    }

    #[test]
    fn test_group_member_total_must_match_demographics() {
        let mut group = valid_group();
        group.total_members = 11;

        let errors = validate_group(&group).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "numero_total_miembros");
    }

    #[test]
    fn test_group_collects_all_errors() {
        let mut group = valid_group();
        group.name = String::new();
        group.city = String::new();
        group.cycle_duration = 0;

        let errors = validate_group(&group).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_valid_report_passes() {
        assert!(validate_report(&valid_report()).is_ok());
    }

    #[test]
    fn test_report_month_out_of_range() {
        let mut report = valid_report();
        report.month = 13;

        let errors = validate_report(&report).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "mes"));
    }

    #[test]
    fn test_report_negative_amount_rejected() {
        let mut report = valid_report();
        report.amount_saved = -5.0;

        let errors = validate_report(&report).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "cantidad_ahorrada"));
    }

    #[test]
    fn test_cycle_end_before_start_rejected() {
        let cycle = Cycle {
            id: 0,
            group_id: 1,
            name: "Ciclo 1".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            status: CycleStatus::Terminated,
        };

        let errors = validate_cycle(&cycle).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "fecha_fin"));
    }

    #[test]
    fn test_movement_negative_amount_rejected() {
        let movement = Movement {
            id: 0,
            cycle_id: 1,
            user_id: "saver-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            amount: -1.0,
            note: None,
        };

        let errors = validate_movement(&movement).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "monto"));
    }
}
