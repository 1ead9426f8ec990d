// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::{Path, PathBuf};

use open_hands::{
    get_groups, get_reports_for_groups, get_user, import_groups, import_reports,
    load_groups_csv, load_reports_csv, monthly_summary, setup_database, MonthlyReportDocument,
    StoreScope,
};

fn db_path() -> PathBuf {
    env::var("OPEN_HANDS_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("open_hands.db"))
}

fn open_db() -> Result<Connection> {
    let path = db_path();
    let conn = Connection::open(&path)
        .with_context(|| format!("Failed to open database at {:?}", path))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import-groups") => run_import_groups(&args[2..]),
        Some("import-reports") => run_import_reports(&args[2..]),
        Some("summary") => run_summary(&args[2..]),
        Some("help") | Some("--help") => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
        None => run_ui_mode(),
    }
}

fn print_usage() {
    println!("Open Hands - savings-group program administration");
    println!();
    println!("Usage:");
    println!("  open-hands                          dashboard (TUI)");
    println!("  open-hands import-groups <csv>      import groups from CSV");
    println!("  open-hands import-reports <csv>     import monthly reports from CSV");
    println!("  open-hands summary <year> <month> <country> [director-id]");
    println!("                                      print the monthly summary document");
    println!();
    println!("Database path comes from OPEN_HANDS_DB (default: open_hands.db)");
}

fn run_import_groups(args: &[String]) -> Result<()> {
    let csv_path = args
        .first()
        .ok_or_else(|| anyhow!("Usage: open-hands import-groups <csv>"))?;

    println!("Loading groups from {}...", csv_path);
    let groups = load_groups_csv(Path::new(csv_path))?;
    println!("Loaded {} group rows", groups.len());

    let conn = open_db()?;
    let stats = import_groups(&conn, &groups)?;
    println!("Inserted: {} groups", stats.inserted);
    println!("Skipped duplicates: {}", stats.duplicates);

    Ok(())
}

fn run_import_reports(args: &[String]) -> Result<()> {
    let csv_path = args
        .first()
        .ok_or_else(|| anyhow!("Usage: open-hands import-reports <csv>"))?;

    println!("Loading reports from {}...", csv_path);
    let reports = load_reports_csv(Path::new(csv_path))?;
    println!("Loaded {} report rows", reports.len());

    let conn = open_db()?;
    let stats = import_reports(&conn, &reports)?;
    println!("Inserted: {} reports", stats.inserted);
    println!("Skipped duplicates: {}", stats.duplicates);

    Ok(())
}

fn run_summary(args: &[String]) -> Result<()> {
    let usage = "Usage: open-hands summary <year> <month> <country> [director-id]";
    let year: i32 = args
        .first()
        .ok_or_else(|| anyhow!(usage))?
        .parse()
        .context("Invalid year")?;
    let month: u32 = args
        .get(1)
        .ok_or_else(|| anyhow!(usage))?
        .parse()
        .context("Invalid month")?;
    if !(1..=12).contains(&month) {
        return Err(anyhow!("Month must be between 1 and 12"));
    }
    let country = args.get(2).ok_or_else(|| anyhow!(usage))?.clone();

    let conn = open_db()?;

    // Resolve the acting director before touching group data. Their
    // registered country wins over the positional argument when both exist.
    let (country, director_name) = match args.get(3) {
        Some(id) => {
            let director =
                get_user(&conn, id)?.ok_or_else(|| anyhow!("Director {} not found", id))?;
            (
                director.country.clone().unwrap_or(country),
                director.full_name(),
            )
        }
        None => (country, "Dirección Nacional".to_string()),
    };

    let groups = get_groups(&conn, &StoreScope::Country(&country))?;
    let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
    let reports = get_reports_for_groups(&conn, &group_ids)?;

    match monthly_summary(&groups, &reports, year, month) {
        Some(summary) => {
            let doc = MonthlyReportDocument::build(&summary, month, year, &country, &director_name);
            println!("{}", doc.render_text());
            println!(
                "Suggested download filename: {}",
                MonthlyReportDocument::filename(month, year)
            );
        }
        None => {
            println!(
                "No hay datos para {} {} en {}",
                open_hands::month_name(month),
                year,
                country
            );
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    use chrono::Datelike;
    use open_hands::get_cycles_for_groups;

    let conn = open_db()?;

    println!("Loading program data...");
    let groups = get_groups(&conn, &StoreScope::All)?;
    let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
    let cycles = get_cycles_for_groups(&conn, &group_ids)?;
    let reports = get_reports_for_groups(&conn, &group_ids)?;

    println!("Loaded {} groups, {} reports", groups.len(), reports.len());
    println!("Starting dashboard... (press 'q' to quit)");

    let today = chrono::Utc::now();
    let mut app = ui::App::new(groups, cycles, reports, today.year(), today.month());
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("TUI mode not available.");
    eprintln!("Rebuild with: cargo build --features tui");
    eprintln!("Or use the API server: cargo run --bin open-hands-server --features server");
    std::process::exit(1);
}
