// Open Hands - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod aggregation;
pub mod db;
pub mod entities;
pub mod export;
pub mod pagination;
pub mod validation;

// Re-export commonly used types
pub use aggregation::{
    dashboard_stats, monthly_summary, scoped_monthly_summary, CycleTally, DashboardStats,
    Demographics, GroupScope, MonthlySummary, SavingsByType,
};
pub use db::{
    count_facilitators, count_reports_for_groups, delete_group, delete_movement, delete_report,
    get_cycles_for_groups, get_groups, get_movements, get_participant, get_reports_for_groups,
    get_reports_page, get_user, import_groups, import_reports, insert_cycle, insert_group,
    insert_movement, insert_report, insert_user, join_cycle, leave_cycle, load_groups_csv,
    load_reports_csv, search_groups_by_name, setup_database, update_cycle, update_group,
    update_movement, update_participant, update_report, ImportStats, StoreScope,
};
pub use entities::{
    Cycle, CycleState, CycleStatus, MonthlyReport, Movement, Participant, Role, SavingsGroup,
    SavingsType, User,
};
pub use export::{month_name, DocumentSection, MonthlyReportDocument, SectionBody, StatCard, StatRow};
pub use pagination::{page_window, total_pages, PageWindow, Pager, PAGE_SIZE};
pub use validation::{
    validate_cycle, validate_group, validate_movement, validate_participant, validate_report,
    ValidationError, ValidationResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
