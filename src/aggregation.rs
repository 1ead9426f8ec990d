// Monthly Aggregation Engine
//
// The one computation every dashboard repeats: roll raw group and report
// collections up into the per-period summary the cards, tables and the
// exported document all render. Pure functions over already-fetched
// snapshots; the store is never touched from here.
//
// Two different notions of "counts for the period" coexist on purpose:
// - group membership and demographics reflect state AS OF the period
//   (groups created on or before it), so duplicated reports cannot
//   double-count members;
// - financial sums reflect reported ACTIVITY in the period (every report
//   row for that month, amendments included).

use crate::entities::{Cycle, CycleState, MonthlyReport, SavingsGroup, SavingsType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// SCOPE
// ============================================================================

/// Which slice of the program a caller is allowed to see. Threaded in
/// explicitly per request instead of read from ambient session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupScope {
    All,
    /// Facilitator dashboard: own groups only
    Facilitator(String),
    /// Coordinator dashboard: groups operating in a zone
    Zone(String),
    /// Director dashboard: groups operating in a country
    Country(String),
}

impl GroupScope {
    pub fn matches(&self, group: &SavingsGroup) -> bool {
        match self {
            GroupScope::All => true,
            GroupScope::Facilitator(id) => group.facilitator_id == *id,
            GroupScope::Zone(zone) => group.zone.as_deref() == Some(zone.as_str()),
            GroupScope::Country(country) => group.country == *country,
        }
    }

    pub fn filter<'a>(&self, groups: &'a [SavingsGroup]) -> Vec<&'a SavingsGroup> {
        groups.iter().filter(|g| self.matches(g)).collect()
    }
}

// ============================================================================
// MONTHLY SUMMARY
// ============================================================================

/// Savings sums per group type, from the period's reports. `youth` is a
/// non-exclusive extra bucket: a youth group's report lands both in its
/// type bucket and here.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SavingsByType {
    #[serde(rename = "Asca")]
    pub asca: f64,
    #[serde(rename = "Rosca")]
    pub rosca: f64,
    #[serde(rename = "Simple")]
    pub simple: f64,
    pub youth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,

    /// Reports filed for the period (duplicates included)
    pub report_count: usize,
    /// Groups whose creation period is on or before the target period
    pub group_count: usize,

    /// Membership and demographics, summed over active groups
    pub total_members: u32,
    pub total_men: u32,
    pub total_women: u32,
    pub total_children: u32,

    pub asca_count: usize,
    pub rosca_count: usize,
    pub simple_count: usize,
    pub youth_count: usize,

    /// Attendance and savings, summed over the period's reports
    pub total_attendance: f64,
    pub total_savings: f64,
    pub savings_by_type: SavingsByType,
}

/// Compute the summary for one (year, month).
///
/// Returns `None` when the period has neither active groups nor reports,
/// so callers can render "no data" distinctly from an all-zero summary.
/// Deterministic and side-effect free; safe to memoize on the inputs.
pub fn monthly_summary(
    groups: &[SavingsGroup],
    reports: &[MonthlyReport],
    year: i32,
    month: u32,
) -> Option<MonthlySummary> {
    let active_groups: Vec<&SavingsGroup> =
        groups.iter().filter(|g| g.is_active_in(year, month)).collect();
    let filtered_reports: Vec<&MonthlyReport> =
        reports.iter().filter(|r| r.is_for(year, month)).collect();

    if active_groups.is_empty() && filtered_reports.is_empty() {
        return None;
    }

    let mut summary = MonthlySummary {
        year,
        month,
        report_count: filtered_reports.len(),
        group_count: active_groups.len(),
        total_members: 0,
        total_men: 0,
        total_women: 0,
        total_children: 0,
        asca_count: 0,
        rosca_count: 0,
        simple_count: 0,
        youth_count: 0,
        total_attendance: 0.0,
        total_savings: 0.0,
        savings_by_type: SavingsByType::default(),
    };

    for group in &active_groups {
        summary.total_members += group.total_members;
        summary.total_men += group.men;
        summary.total_women += group.women;
        summary.total_children += group.children();

        match group.savings_type {
            SavingsType::Asca => summary.asca_count += 1,
            SavingsType::Rosca => summary.rosca_count += 1,
            SavingsType::Simple => summary.simple_count += 1,
        }
        if group.youth_group {
            summary.youth_count += 1;
        }
    }

    // Type buckets are keyed by the reporting group, looked up in the full
    // collection: a report from a not-yet-active group (created later in
    // the year) still carries its type.
    let by_id: HashMap<i64, &SavingsGroup> = groups.iter().map(|g| (g.id, g)).collect();

    for report in &filtered_reports {
        summary.total_attendance += report.average_attendance.unwrap_or(0.0);
        summary.total_savings += report.amount_saved;

        if let Some(group) = by_id.get(&report.group_id) {
            match group.savings_type {
                SavingsType::Asca => summary.savings_by_type.asca += report.amount_saved,
                SavingsType::Rosca => summary.savings_by_type.rosca += report.amount_saved,
                SavingsType::Simple => summary.savings_by_type.simple += report.amount_saved,
            }
            if group.youth_group {
                summary.savings_by_type.youth += report.amount_saved;
            }
        }
    }

    Some(summary)
}

/// §4.1 restricted to one role's slice: the scope filters the groups, and
/// only reports from the retained groups are aggregated.
pub fn scoped_monthly_summary(
    scope: &GroupScope,
    groups: &[SavingsGroup],
    reports: &[MonthlyReport],
    year: i32,
    month: u32,
) -> Option<MonthlySummary> {
    let scoped_groups: Vec<SavingsGroup> =
        groups.iter().filter(|g| scope.matches(g)).cloned().collect();
    let ids: std::collections::HashSet<i64> = scoped_groups.iter().map(|g| g.id).collect();
    let scoped_reports: Vec<MonthlyReport> = reports
        .iter()
        .filter(|r| ids.contains(&r.group_id))
        .cloned()
        .collect();

    monthly_summary(&scoped_groups, &scoped_reports, year, month)
}

// ============================================================================
// DASHBOARD ROLLUP (home pages, no period filter)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CycleTally {
    pub without_cycle: usize,
    pub active: usize,
    pub terminated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Demographics {
    pub men: u32,
    pub women: u32,
    pub children: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub group_count: usize,
    pub cycle_tally: CycleTally,
    /// All-time sum over every report, regardless of period
    pub total_saved: f64,
    pub demographics: Demographics,
}

/// Roll up the home-page cards: every group in scope, its cycle state and
/// demographics, plus the all-time savings total from reports.
pub fn dashboard_stats(
    groups: &[SavingsGroup],
    cycles: &[Cycle],
    reports: &[MonthlyReport],
) -> DashboardStats {
    let mut by_group: HashMap<i64, Vec<Cycle>> = HashMap::new();
    for cycle in cycles {
        by_group.entry(cycle.group_id).or_default().push(cycle.clone());
    }

    let mut stats = DashboardStats {
        group_count: groups.len(),
        cycle_tally: CycleTally::default(),
        total_saved: reports.iter().map(|r| r.amount_saved).sum(),
        demographics: Demographics::default(),
    };

    for group in groups {
        stats.demographics.men += group.men;
        stats.demographics.women += group.women;
        stats.demographics.children += group.children();

        let group_cycles = by_group.get(&group.id).map(Vec::as_slice).unwrap_or(&[]);
        match CycleState::classify(group_cycles) {
            CycleState::WithoutCycle => stats.cycle_tally.without_cycle += 1,
            CycleState::Active => stats.cycle_tally.active += 1,
            CycleState::Terminated => stats.cycle_tally.terminated += 1,
        }
    }

    stats.demographics.total =
        stats.demographics.men + stats.demographics.women + stats.demographics.children;

    stats
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CycleStatus;
    use chrono::{NaiveDate, Utc};

    fn group(id: i64, members: u32, ty: SavingsType, youth: bool) -> SavingsGroup {
        SavingsGroup {
            id,
            name: format!("Grupo {}", id),
            country: "Colombia".to_string(),
            city: "Barranquilla".to_string(),
            zone: None,
            total_members: members,
            men: members / 2,
            women: members - members / 2,
            boys: 0,
            girls: 0,
            savings_type: ty,
            youth_group: youth,
            cycle_duration: 12,
            creation_year: Some(2024),
            creation_month: Some(1),
            facilitator_id: "fac-1".to_string(),
        }
    }

    fn report(group_id: i64, year: i32, month: u32, saved: f64) -> MonthlyReport {
        MonthlyReport {
            id: 0,
            group_id,
            facilitator_id: "fac-1".to_string(),
            year,
            month,
            meeting_count: 4,
            average_attendance: Some(8.0),
            amount_saved: saved,
            comments: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_period_is_none() {
        assert!(monthly_summary(&[], &[], 2024, 3).is_none());

        // Groups exist but none created yet, and no reports: still no data.
        let mut late = group(1, 10, SavingsType::Simple, false);
        late.creation_year = Some(2025);
        assert!(monthly_summary(&[late], &[], 2024, 3).is_none());
    }

    #[test]
    fn test_all_zero_summary_is_not_none() {
        let groups = vec![group(1, 0, SavingsType::Simple, false)];
        let summary = monthly_summary(&groups, &[], 2024, 3).unwrap();
        assert_eq!(summary.group_count, 1);
        assert_eq!(summary.report_count, 0);
        assert_eq!(summary.total_savings, 0.0);
    }

    #[test]
    fn test_scenario_a() {
        let groups = vec![
            group(1, 10, SavingsType::Simple, false),
            group(2, 5, SavingsType::Asca, true),
        ];
        let reports = vec![report(1, 2024, 3, 100.0), report(2, 2024, 3, 50.0)];

        let summary = monthly_summary(&groups, &reports, 2024, 3).unwrap();
        assert_eq!(summary.group_count, 2);
        assert_eq!(summary.report_count, 2);
        assert_eq!(summary.total_members, 15);
        assert_eq!(summary.simple_count, 1);
        assert_eq!(summary.asca_count, 1);
        assert_eq!(summary.rosca_count, 0);
        assert_eq!(summary.youth_count, 1);
        assert_eq!(summary.total_savings, 150.0);
        assert_eq!(summary.savings_by_type.asca, 50.0);
        assert_eq!(summary.savings_by_type.rosca, 0.0);
        assert_eq!(summary.savings_by_type.simple, 100.0);
        assert_eq!(summary.savings_by_type.youth, 50.0);
    }

    #[test]
    fn test_scenario_b_group_created_after_period() {
        // Group created April 2024, queried for March 2024: excluded from
        // the group-side totals even though its March report exists.
        let mut late = group(1, 10, SavingsType::Simple, false);
        late.creation_year = Some(2024);
        late.creation_month = Some(4);
        let reports = vec![report(1, 2024, 3, 80.0)];

        let summary = monthly_summary(&[late], &reports, 2024, 3).unwrap();
        assert_eq!(summary.group_count, 0);
        assert_eq!(summary.total_members, 0);
        assert_eq!(summary.report_count, 1);
        assert_eq!(summary.total_savings, 80.0);
        // The report still carries its group's type.
        assert_eq!(summary.savings_by_type.simple, 80.0);
    }

    #[test]
    fn test_member_totals_idempotent_under_report_duplication() {
        let groups = vec![group(1, 12, SavingsType::Rosca, false)];
        let once = vec![report(1, 2024, 3, 40.0)];
        let thrice = vec![
            report(1, 2024, 3, 40.0),
            report(1, 2024, 3, 40.0),
            report(1, 2024, 3, 40.0),
        ];

        let a = monthly_summary(&groups, &once, 2024, 3).unwrap();
        let b = monthly_summary(&groups, &thrice, 2024, 3).unwrap();

        // Membership comes from groups, not reports.
        assert_eq!(a.total_members, b.total_members);
        assert_eq!(a.group_count, b.group_count);
        // Financial sums do scale with the rows.
        assert_eq!(b.report_count, 3);
        assert_eq!(b.total_savings, 120.0);
    }

    #[test]
    fn test_type_counts_partition_group_count() {
        let groups = vec![
            group(1, 10, SavingsType::Simple, false),
            group(2, 5, SavingsType::Asca, true),
            group(3, 8, SavingsType::Rosca, false),
            group(4, 6, SavingsType::Asca, false),
        ];
        let summary = monthly_summary(&groups, &[], 2024, 6).unwrap();
        assert_eq!(
            summary.asca_count + summary.rosca_count + summary.simple_count,
            summary.group_count
        );
    }

    #[test]
    fn test_type_buckets_partition_savings_youth_is_subset() {
        let groups = vec![
            group(1, 10, SavingsType::Simple, true),
            group(2, 5, SavingsType::Asca, false),
            group(3, 8, SavingsType::Rosca, true),
        ];
        let reports = vec![
            report(1, 2024, 3, 100.0),
            report(2, 2024, 3, 70.0),
            report(3, 2024, 3, 30.0),
        ];

        let s = monthly_summary(&groups, &reports, 2024, 3).unwrap();
        let by_type = s.savings_by_type;
        assert_eq!(by_type.asca + by_type.rosca + by_type.simple, s.total_savings);
        assert!(by_type.youth <= s.total_savings);
        assert_eq!(by_type.youth, 130.0);
    }

    #[test]
    fn test_null_attendance_treated_as_zero() {
        let groups = vec![group(1, 10, SavingsType::Simple, false)];
        let mut r = report(1, 2024, 3, 10.0);
        r.average_attendance = None;

        let summary = monthly_summary(&groups, &[r], 2024, 3).unwrap();
        assert_eq!(summary.total_attendance, 0.0);
    }

    #[test]
    fn test_scoped_summary_filters_groups_and_their_reports() {
        let mut other_country = group(2, 5, SavingsType::Asca, false);
        other_country.country = "Venezuela".to_string();
        let groups = vec![group(1, 10, SavingsType::Simple, false), other_country];
        let reports = vec![report(1, 2024, 3, 100.0), report(2, 2024, 3, 999.0)];

        let scope = GroupScope::Country("Colombia".to_string());
        let summary = scoped_monthly_summary(&scope, &groups, &reports, 2024, 3).unwrap();
        assert_eq!(summary.group_count, 1);
        assert_eq!(summary.report_count, 1);
        assert_eq!(summary.total_savings, 100.0);
    }

    #[test]
    fn test_scope_matching() {
        let mut g = group(1, 10, SavingsType::Simple, false);
        g.zone = Some("Norte".to_string());

        assert!(GroupScope::All.matches(&g));
        assert!(GroupScope::Facilitator("fac-1".to_string()).matches(&g));
        assert!(!GroupScope::Facilitator("fac-2".to_string()).matches(&g));
        assert!(GroupScope::Zone("Norte".to_string()).matches(&g));
        assert!(!GroupScope::Zone("Sur".to_string()).matches(&g));
        assert!(GroupScope::Country("Colombia".to_string()).matches(&g));
    }

    #[test]
    fn test_dashboard_stats() {
        let groups = vec![
            group(1, 10, SavingsType::Simple, false),
            group(2, 5, SavingsType::Asca, false),
            group(3, 8, SavingsType::Rosca, false),
        ];
        let cycles = vec![
            Cycle {
                id: 1,
                group_id: 1,
                name: "Ciclo 1".to_string(),
                start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                end_date: None,
                status: CycleStatus::Active,
            },
            Cycle {
                id: 2,
                group_id: 2,
                name: "Ciclo 1".to_string(),
                start_date: NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2023, 12, 15),
                status: CycleStatus::Terminated,
            },
        ];
        let reports = vec![report(1, 2024, 1, 100.0), report(1, 2024, 2, 60.0)];

        let stats = dashboard_stats(&groups, &cycles, &reports);
        assert_eq!(stats.group_count, 3);
        assert_eq!(stats.cycle_tally.active, 1);
        assert_eq!(stats.cycle_tally.terminated, 1);
        assert_eq!(stats.cycle_tally.without_cycle, 1);
        assert_eq!(stats.total_saved, 160.0);
        assert_eq!(stats.demographics.total, 23);
    }
}
