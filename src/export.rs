// Report Document Export
//
// Pure transform from a MonthlySummary plus display metadata to a
// paginated document tree: header, general summary cards, a two-column
// group-type/demographics breakdown, savings-by-type rows, footer
// timestamp. Rasterizing the tree to an actual PDF is the export
// collaborator's job; this module only owns the structure, the plain-text
// rendering and the filename convention.

use crate::aggregation::MonthlySummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Spanish month names, indexed by month - 1.
pub const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get((month.saturating_sub(1)) as usize)
        .copied()
        .unwrap_or("")
}

// ============================================================================
// DOCUMENT TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatCard {
    pub label: String,
    pub value: String,
    /// Full-width highlighted card (the savings total)
    pub highlight: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SectionBody {
    Cards(Vec<StatCard>),
    Rows(Vec<StatRow>),
    /// Side-by-side sections (group types | demographics)
    Columns(Vec<DocumentSection>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub title: String,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReportDocument {
    pub title: String,
    pub program: String,
    pub director_name: String,
    pub country: String,
    pub period: String,
    pub sections: Vec<DocumentSection>,
    pub generated_at: DateTime<Utc>,
}

fn money(amount: f64) -> String {
    format!("${:.2}", amount)
}

impl MonthlyReportDocument {
    /// Build the fixed document layout from a summary.
    pub fn build(
        summary: &MonthlySummary,
        month: u32,
        year: i32,
        country: &str,
        director_name: &str,
    ) -> Self {
        let general = DocumentSection {
            title: "Resumen General".to_string(),
            body: SectionBody::Cards(vec![
                StatCard {
                    label: "Reportes".to_string(),
                    value: summary.report_count.to_string(),
                    highlight: false,
                },
                StatCard {
                    label: "Grupos".to_string(),
                    value: summary.group_count.to_string(),
                    highlight: false,
                },
                StatCard {
                    label: "Total Miembros".to_string(),
                    value: summary.total_members.to_string(),
                    highlight: false,
                },
                StatCard {
                    label: "Promedio Asistencia".to_string(),
                    value: format!("{:.1}", summary.total_attendance),
                    highlight: false,
                },
                StatCard {
                    label: "Total Ahorrado".to_string(),
                    value: money(summary.total_savings),
                    highlight: true,
                },
            ]),
        };

        let group_types = DocumentSection {
            title: "Tipos de Grupo".to_string(),
            body: SectionBody::Rows(vec![
                StatRow {
                    label: "ASCA".to_string(),
                    value: summary.asca_count.to_string(),
                },
                StatRow {
                    label: "ROSCA".to_string(),
                    value: summary.rosca_count.to_string(),
                },
                StatRow {
                    label: "Simple".to_string(),
                    value: summary.simple_count.to_string(),
                },
                StatRow {
                    label: "Juveniles".to_string(),
                    value: summary.youth_count.to_string(),
                },
            ]),
        };

        let demographics = DocumentSection {
            title: "Demografía".to_string(),
            body: SectionBody::Rows(vec![
                StatRow {
                    label: "Hombres".to_string(),
                    value: summary.total_men.to_string(),
                },
                StatRow {
                    label: "Mujeres".to_string(),
                    value: summary.total_women.to_string(),
                },
                StatRow {
                    label: "Niños/as".to_string(),
                    value: summary.total_children.to_string(),
                },
            ]),
        };

        let savings = DocumentSection {
            title: "Ahorro por Tipo".to_string(),
            body: SectionBody::Rows(vec![
                StatRow {
                    label: "Grupos ASCA".to_string(),
                    value: money(summary.savings_by_type.asca),
                },
                StatRow {
                    label: "Grupos ROSCA".to_string(),
                    value: money(summary.savings_by_type.rosca),
                },
                StatRow {
                    label: "Grupos Simple".to_string(),
                    value: money(summary.savings_by_type.simple),
                },
                StatRow {
                    label: "Grupos Juveniles".to_string(),
                    value: money(summary.savings_by_type.youth),
                },
            ]),
        };

        MonthlyReportDocument {
            title: "Reporte Mensual".to_string(),
            program: "Open Hands".to_string(),
            director_name: director_name.to_string(),
            country: country.to_string(),
            period: format!("{} {}", month_name(month), year),
            sections: vec![
                general,
                DocumentSection {
                    title: String::new(),
                    body: SectionBody::Columns(vec![group_types, demographics]),
                },
                savings,
            ],
            generated_at: Utc::now(),
        }
    }

    /// Download filename convention: `Reporte_Mensual_<MonthName>_<Year>.pdf`.
    pub fn filename(month: u32, year: i32) -> String {
        format!("Reporte_Mensual_{}_{}.pdf", month_name(month), year)
    }

    /// Printable plain-text rendering, section order as built.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{} - {}\n", self.title, self.program));
        out.push_str(&format!(
            "{} | {} | {}\n",
            self.director_name, self.country, self.period
        ));
        out.push_str(&"=".repeat(50));
        out.push('\n');

        for section in &self.sections {
            render_section(&mut out, section);
        }

        out.push_str(&"-".repeat(50));
        out.push('\n');
        out.push_str(&format!(
            "Generado el {} - {}\n",
            self.generated_at.format("%d/%m/%Y"),
            self.program
        ));
        out
    }
}

fn render_section(out: &mut String, section: &DocumentSection) {
    if !section.title.is_empty() {
        out.push_str(&format!("\n{}\n", section.title));
    }
    match &section.body {
        SectionBody::Cards(cards) => {
            for card in cards {
                out.push_str(&format!("  {:<22} {}\n", card.label, card.value));
            }
        }
        SectionBody::Rows(rows) => {
            for row in rows {
                out.push_str(&format!("  {:<22} {}\n", row.label, row.value));
            }
        }
        SectionBody::Columns(columns) => {
            for column in columns {
                render_section(out, column);
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::SavingsByType;

    fn sample_summary() -> MonthlySummary {
        MonthlySummary {
            year: 2024,
            month: 3,
            report_count: 2,
            group_count: 2,
            total_members: 15,
            total_men: 6,
            total_women: 7,
            total_children: 2,
            asca_count: 1,
            rosca_count: 0,
            simple_count: 1,
            youth_count: 1,
            total_attendance: 16.0,
            total_savings: 150.0,
            savings_by_type: SavingsByType {
                asca: 50.0,
                rosca: 0.0,
                simple: 100.0,
                youth: 50.0,
            },
        }
    }

    #[test]
    fn test_filename_convention() {
        assert_eq!(
            MonthlyReportDocument::filename(3, 2024),
            "Reporte_Mensual_Marzo_2024.pdf"
        );
        assert_eq!(
            MonthlyReportDocument::filename(12, 2025),
            "Reporte_Mensual_Diciembre_2025.pdf"
        );
    }

    #[test]
    fn test_month_name_bounds() {
        assert_eq!(month_name(1), "Enero");
        assert_eq!(month_name(12), "Diciembre");
        assert_eq!(month_name(0), "");
        assert_eq!(month_name(13), "");
    }

    #[test]
    fn test_document_has_fixed_sections() {
        let doc =
            MonthlyReportDocument::build(&sample_summary(), 3, 2024, "Colombia", "Marta Rojas");

        assert_eq!(doc.period, "Marzo 2024");
        assert_eq!(doc.sections.len(), 3);
        assert_eq!(doc.sections[0].title, "Resumen General");
        assert_eq!(doc.sections[2].title, "Ahorro por Tipo");

        // The middle section is the two-column breakdown.
        match &doc.sections[1].body {
            SectionBody::Columns(columns) => {
                assert_eq!(columns.len(), 2);
                assert_eq!(columns[0].title, "Tipos de Grupo");
                assert_eq!(columns[1].title, "Demografía");
            }
            other => panic!("expected columns, got {:?}", other),
        }
    }

    #[test]
    fn test_summary_values_carried_through() {
        let doc =
            MonthlyReportDocument::build(&sample_summary(), 3, 2024, "Colombia", "Marta Rojas");

        let cards = match &doc.sections[0].body {
            SectionBody::Cards(cards) => cards,
            other => panic!("expected cards, got {:?}", other),
        };
        assert_eq!(cards.len(), 5);
        assert_eq!(cards[0].value, "2");
        assert_eq!(cards[4].value, "$150.00");
        assert!(cards[4].highlight);
    }

    #[test]
    fn test_render_text_contains_all_sections() {
        let doc =
            MonthlyReportDocument::build(&sample_summary(), 3, 2024, "Colombia", "Marta Rojas");
        let text = doc.render_text();

        for needle in [
            "Reporte Mensual",
            "Marta Rojas",
            "Marzo 2024",
            "Resumen General",
            "Tipos de Grupo",
            "Demografía",
            "Ahorro por Tipo",
            "Generado el",
        ] {
            assert!(text.contains(needle), "missing {:?} in:\n{}", needle, text);
        }
    }

    #[test]
    fn test_document_serializes_to_json() {
        let doc =
            MonthlyReportDocument::build(&sample_summary(), 3, 2024, "Colombia", "Marta Rojas");
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("Resumen General"));

        let back: MonthlyReportDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sections.len(), 3);
    }
}
