use crate::entities::{
    Cycle, CycleStatus, MonthlyReport, Movement, Participant, Role, SavingsGroup, SavingsType,
    User,
};
use crate::pagination::PageWindow;
use crate::validation::{
    validate_cycle, validate_group, validate_movement, validate_participant, validate_report,
    ValidationResult,
};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS usuarios (
            id TEXT PRIMARY KEY,
            nombre TEXT NOT NULL,
            apellido TEXT NOT NULL,
            rol TEXT NOT NULL,
            pais_residencia TEXT,
            zona TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grupos_ahorro (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            idempotency_hash TEXT UNIQUE NOT NULL,
            nombre_grupo TEXT NOT NULL,
            pais_operacion TEXT NOT NULL,
            ciudad_operacion TEXT NOT NULL,
            zona_operacion TEXT,
            numero_total_miembros INTEGER NOT NULL,
            cantidad_hombres INTEGER NOT NULL,
            cantidad_mujeres INTEGER NOT NULL,
            cantidad_ninos INTEGER NOT NULL,
            cantidad_ninas INTEGER NOT NULL,
            tipo_ahorro TEXT NOT NULL,
            grupo_juvenil INTEGER NOT NULL DEFAULT 0,
            duracion_ciclo INTEGER NOT NULL,
            ano_creacion INTEGER,
            mes_creacion INTEGER,
            facilitador_id TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ciclos_ahorro (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            grupo_id INTEGER NOT NULL,
            nombre TEXT NOT NULL,
            fecha_inicio TEXT NOT NULL,
            fecha_fin TEXT,
            estado TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS reportes_grupos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            idempotency_hash TEXT UNIQUE NOT NULL,
            grupo_id INTEGER NOT NULL,
            facilitador_id TEXT NOT NULL,
            ano INTEGER NOT NULL,
            mes INTEGER NOT NULL,
            numero_reuniones INTEGER NOT NULL,
            promedio_asistencia REAL,
            cantidad_ahorrada REAL NOT NULL,
            comentarios TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS participantes_ciclo (
            ciclo_id INTEGER NOT NULL,
            usuario_id TEXT NOT NULL,
            proposito TEXT NOT NULL,
            meta_ahorro REAL NOT NULL,
            PRIMARY KEY (ciclo_id, usuario_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS movimientos_ahorro (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ciclo_id INTEGER NOT NULL,
            usuario_id TEXT NOT NULL,
            fecha TEXT NOT NULL,
            monto REAL NOT NULL,
            nota TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grupos_pais ON grupos_ahorro(pais_operacion)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grupos_facilitador ON grupos_ahorro(facilitador_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ciclos_grupo ON ciclos_ahorro(grupo_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reportes_grupo ON reportes_grupos(grupo_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reportes_periodo ON reportes_grupos(ano, mes)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_movimientos_ciclo_usuario
            ON movimientos_ahorro(ciclo_id, usuario_id)",
        [],
    )?;

    Ok(())
}

/// Collapse field-level validation errors into one store error. Writes are
/// never attempted with a failing form.
fn ensure_valid(result: ValidationResult) -> Result<()> {
    result.map_err(|errors| {
        let joined = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        anyhow!("validation failed: {}", joined)
    })
}

// ============================================================================
// SCOPED GROUP QUERIES
// ============================================================================

/// Which groups a query is allowed to touch. The caller's identity is
/// resolved first and passed in explicitly; nothing here reads ambient
/// session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreScope<'a> {
    All,
    Facilitator(&'a str),
    Zone(&'a str),
    Country(&'a str),
}

const GROUP_COLUMNS: &str = "id, nombre_grupo, pais_operacion, ciudad_operacion, zona_operacion,
     numero_total_miembros, cantidad_hombres, cantidad_mujeres, cantidad_ninos, cantidad_ninas,
     tipo_ahorro, grupo_juvenil, duracion_ciclo, ano_creacion, mes_creacion, facilitador_id";

fn group_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SavingsGroup> {
    let tipo: String = row.get(10)?;
    Ok(SavingsGroup {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        city: row.get(3)?,
        zone: row.get(4)?,
        total_members: row.get(5)?,
        men: row.get(6)?,
        women: row.get(7)?,
        boys: row.get(8)?,
        girls: row.get(9)?,
        savings_type: SavingsType::parse(&tipo).ok_or(rusqlite::Error::InvalidQuery)?,
        youth_group: row.get::<_, i64>(11)? != 0,
        cycle_duration: row.get(12)?,
        creation_year: row.get(13)?,
        creation_month: row.get(14)?,
        facilitator_id: row.get(15)?,
    })
}

pub fn get_groups(conn: &Connection, scope: &StoreScope<'_>) -> Result<Vec<SavingsGroup>> {
    let (filter, param): (&str, Option<&str>) = match scope {
        StoreScope::All => ("1 = 1", None),
        StoreScope::Facilitator(id) => ("facilitador_id = ?1", Some(id)),
        StoreScope::Zone(zone) => ("zona_operacion = ?1", Some(zone)),
        StoreScope::Country(country) => ("pais_operacion = ?1", Some(country)),
    };

    let sql = format!(
        "SELECT {} FROM grupos_ahorro WHERE {} ORDER BY nombre_grupo",
        GROUP_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = match param {
        Some(value) => stmt.query_map(params![value], group_from_row)?,
        None => stmt.query_map([], group_from_row)?,
    };

    let mut groups = Vec::new();
    for row in rows {
        groups.push(row.context("Failed to read group row")?);
    }
    Ok(groups)
}

/// Name search for the saver "find my group" screen.
pub fn search_groups_by_name(conn: &Connection, query: &str) -> Result<Vec<SavingsGroup>> {
    let sql = format!(
        "SELECT {} FROM grupos_ahorro WHERE nombre_grupo LIKE ?1 ORDER BY nombre_grupo",
        GROUP_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let pattern = format!("%{}%", query);

    let rows = stmt.query_map(params![pattern], group_from_row)?;
    let mut groups = Vec::new();
    for row in rows {
        groups.push(row.context("Failed to read group row")?);
    }
    Ok(groups)
}

pub fn insert_group(conn: &Connection, group: &SavingsGroup) -> Result<i64> {
    ensure_valid(validate_group(group))?;

    conn.execute(
        "INSERT INTO grupos_ahorro (
            idempotency_hash, nombre_grupo, pais_operacion, ciudad_operacion, zona_operacion,
            numero_total_miembros, cantidad_hombres, cantidad_mujeres, cantidad_ninos,
            cantidad_ninas, tipo_ahorro, grupo_juvenil, duracion_ciclo, ano_creacion,
            mes_creacion, facilitador_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            group.compute_idempotency_hash(),
            group.name,
            group.country,
            group.city,
            group.zone,
            group.total_members,
            group.men,
            group.women,
            group.boys,
            group.girls,
            group.savings_type.as_str(),
            group.youth_group as i64,
            group.cycle_duration,
            group.creation_year,
            group.creation_month,
            group.facilitator_id,
        ],
    )
    .context("Failed to insert group")?;

    Ok(conn.last_insert_rowid())
}

pub fn update_group(conn: &Connection, group: &SavingsGroup) -> Result<()> {
    ensure_valid(validate_group(group))?;

    let updated = conn
        .execute(
            "UPDATE grupos_ahorro SET
                nombre_grupo = ?1, pais_operacion = ?2, ciudad_operacion = ?3,
                zona_operacion = ?4, numero_total_miembros = ?5, cantidad_hombres = ?6,
                cantidad_mujeres = ?7, cantidad_ninos = ?8, cantidad_ninas = ?9,
                tipo_ahorro = ?10, grupo_juvenil = ?11, duracion_ciclo = ?12,
                ano_creacion = ?13, mes_creacion = ?14, idempotency_hash = ?15
             WHERE id = ?16",
            params![
                group.name,
                group.country,
                group.city,
                group.zone,
                group.total_members,
                group.men,
                group.women,
                group.boys,
                group.girls,
                group.savings_type.as_str(),
                group.youth_group as i64,
                group.cycle_duration,
                group.creation_year,
                group.creation_month,
                // Keep the dedupe key in step with the row so a later
                // re-import of the edited CSV line is still skipped.
                group.compute_idempotency_hash(),
                group.id,
            ],
        )
        .context("Failed to update group")?;

    if updated == 0 {
        return Err(anyhow!("Group {} not found", group.id));
    }
    Ok(())
}

pub fn delete_group(conn: &Connection, group_id: i64) -> Result<()> {
    conn.execute("DELETE FROM grupos_ahorro WHERE id = ?1", params![group_id])
        .context("Failed to delete group")?;
    Ok(())
}

// ============================================================================
// USERS
// ============================================================================

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO usuarios (id, nombre, apellido, rol, pais_residencia, zona)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.first_name,
            user.last_name,
            user.role.as_str(),
            user.country,
            user.zone,
        ],
    )
    .context("Failed to insert user")?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, nombre, apellido, rol, pais_residencia, zona FROM usuarios WHERE id = ?1",
    )?;

    let mut rows = stmt.query_map(params![id], |row| {
        let rol: String = row.get(3)?;
        Ok(User {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            role: Role::parse(&rol).ok_or(rusqlite::Error::InvalidQuery)?,
            country: row.get(4)?,
            zone: row.get(5)?,
        })
    })?;

    match rows.next() {
        Some(user) => Ok(Some(user.context("Failed to read user row")?)),
        None => Ok(None),
    }
}

pub fn count_facilitators(conn: &Connection, country: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM usuarios WHERE pais_residencia = ?1 AND rol = 'facilitador'",
        params![country],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

// ============================================================================
// CYCLES
// ============================================================================

fn cycle_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cycle> {
    let start: String = row.get(3)?;
    let end: Option<String> = row.get(4)?;
    let estado: String = row.get(5)?;

    Ok(Cycle {
        id: row.get(0)?,
        group_id: row.get(1)?,
        name: row.get(2)?,
        start_date: NaiveDate::parse_from_str(&start, "%Y-%m-%d")
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        end_date: match end {
            Some(s) => Some(
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
            ),
            None => None,
        },
        status: CycleStatus::parse(&estado).ok_or(rusqlite::Error::InvalidQuery)?,
    })
}

pub fn insert_cycle(conn: &Connection, cycle: &Cycle) -> Result<i64> {
    ensure_valid(validate_cycle(cycle))?;

    conn.execute(
        "INSERT INTO ciclos_ahorro (grupo_id, nombre, fecha_inicio, fecha_fin, estado)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            cycle.group_id,
            cycle.name,
            cycle.start_date.format("%Y-%m-%d").to_string(),
            cycle.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
            cycle.status.as_str(),
        ],
    )
    .context("Failed to insert cycle")?;

    Ok(conn.last_insert_rowid())
}

pub fn update_cycle(conn: &Connection, cycle: &Cycle) -> Result<()> {
    ensure_valid(validate_cycle(cycle))?;

    let updated = conn
        .execute(
            "UPDATE ciclos_ahorro SET nombre = ?1, fecha_inicio = ?2, fecha_fin = ?3, estado = ?4
             WHERE id = ?5",
            params![
                cycle.name,
                cycle.start_date.format("%Y-%m-%d").to_string(),
                cycle.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                cycle.status.as_str(),
                cycle.id,
            ],
        )
        .context("Failed to update cycle")?;

    if updated == 0 {
        return Err(anyhow!("Cycle {} not found", cycle.id));
    }
    Ok(())
}

pub fn get_cycles_for_groups(conn: &Connection, group_ids: &[i64]) -> Result<Vec<Cycle>> {
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; group_ids.len()].join(", ");
    let sql = format!(
        "SELECT id, grupo_id, nombre, fecha_inicio, fecha_fin, estado
         FROM ciclos_ahorro WHERE grupo_id IN ({}) ORDER BY id",
        placeholders
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt.query_map(params_from_iter(group_ids.iter()), cycle_from_row)?;
    let mut cycles = Vec::new();
    for row in rows {
        cycles.push(row.context("Failed to read cycle row")?);
    }
    Ok(cycles)
}

// ============================================================================
// MONTHLY REPORTS
// ============================================================================

const REPORT_COLUMNS: &str = "id, grupo_id, facilitador_id, ano, mes, numero_reuniones,
     promedio_asistencia, cantidad_ahorrada, comentarios, created_at";

fn report_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MonthlyReport> {
    let created: String = row.get(9)?;
    Ok(MonthlyReport {
        id: row.get(0)?,
        group_id: row.get(1)?,
        facilitator_id: row.get(2)?,
        year: row.get(3)?,
        month: row.get(4)?,
        meeting_count: row.get(5)?,
        average_attendance: row.get(6)?,
        amount_saved: row.get(7)?,
        comments: row.get(8)?,
        created_at: DateTime::parse_from_rfc3339(&created)
            .map_err(|_| rusqlite::Error::InvalidQuery)?
            .with_timezone(&Utc),
    })
}

pub fn insert_report(conn: &Connection, report: &MonthlyReport) -> Result<i64> {
    ensure_valid(validate_report(report))?;

    conn.execute(
        "INSERT INTO reportes_grupos (
            idempotency_hash, grupo_id, facilitador_id, ano, mes, numero_reuniones,
            promedio_asistencia, cantidad_ahorrada, comentarios, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            report.compute_idempotency_hash(),
            report.group_id,
            report.facilitator_id,
            report.year,
            report.month,
            report.meeting_count,
            report.average_attendance,
            report.amount_saved,
            report.comments,
            report.created_at.to_rfc3339(),
        ],
    )
    .context("Failed to insert report")?;

    Ok(conn.last_insert_rowid())
}

pub fn update_report(conn: &Connection, report: &MonthlyReport) -> Result<()> {
    ensure_valid(validate_report(report))?;

    let updated = conn
        .execute(
            "UPDATE reportes_grupos SET
                ano = ?1, mes = ?2, numero_reuniones = ?3, promedio_asistencia = ?4,
                cantidad_ahorrada = ?5, comentarios = ?6, idempotency_hash = ?7
             WHERE id = ?8",
            params![
                report.year,
                report.month,
                report.meeting_count,
                report.average_attendance,
                report.amount_saved,
                report.comments,
                report.compute_idempotency_hash(),
                report.id,
            ],
        )
        .context("Failed to update report")?;

    if updated == 0 {
        return Err(anyhow!("Report {} not found", report.id));
    }
    Ok(())
}

pub fn delete_report(conn: &Connection, report_id: i64) -> Result<()> {
    conn.execute("DELETE FROM reportes_grupos WHERE id = ?1", params![report_id])
        .context("Failed to delete report")?;
    Ok(())
}

/// Exact count for the page indicator, counted server-side.
pub fn count_reports_for_groups(conn: &Connection, group_ids: &[i64]) -> Result<usize> {
    if group_ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; group_ids.len()].join(", ");
    let sql = format!(
        "SELECT COUNT(*) FROM reportes_grupos WHERE grupo_id IN ({})",
        placeholders
    );
    let count: i64 = conn.query_row(&sql, params_from_iter(group_ids.iter()), |row| row.get(0))?;
    Ok(count as usize)
}

/// One listing page, newest period first. The window comes from
/// `pagination::page_window`.
pub fn get_reports_page(
    conn: &Connection,
    group_ids: &[i64],
    window: PageWindow,
) -> Result<Vec<MonthlyReport>> {
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; group_ids.len()].join(", ");
    let sql = format!(
        "SELECT {} FROM reportes_grupos WHERE grupo_id IN ({})
         ORDER BY ano DESC, mes DESC, id DESC LIMIT {} OFFSET {}",
        REPORT_COLUMNS, placeholders, window.limit, window.offset
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt.query_map(params_from_iter(group_ids.iter()), report_from_row)?;
    let mut reports = Vec::new();
    for row in rows {
        reports.push(row.context("Failed to read report row")?);
    }
    Ok(reports)
}

/// Every report for the given groups, for aggregation.
pub fn get_reports_for_groups(conn: &Connection, group_ids: &[i64]) -> Result<Vec<MonthlyReport>> {
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; group_ids.len()].join(", ");
    let sql = format!(
        "SELECT {} FROM reportes_grupos WHERE grupo_id IN ({}) ORDER BY ano DESC, mes DESC",
        REPORT_COLUMNS, placeholders
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt.query_map(params_from_iter(group_ids.iter()), report_from_row)?;
    let mut reports = Vec::new();
    for row in rows {
        reports.push(row.context("Failed to read report row")?);
    }
    Ok(reports)
}

// ============================================================================
// PARTICIPANTS & MOVEMENTS
// ============================================================================

pub fn join_cycle(conn: &Connection, participant: &Participant) -> Result<()> {
    ensure_valid(validate_participant(participant))?;

    conn.execute(
        "INSERT INTO participantes_ciclo (ciclo_id, usuario_id, proposito, meta_ahorro)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            participant.cycle_id,
            participant.user_id,
            participant.purpose,
            participant.savings_goal,
        ],
    )
    .context("Failed to join cycle")?;
    Ok(())
}

pub fn get_participant(
    conn: &Connection,
    cycle_id: i64,
    user_id: &str,
) -> Result<Option<Participant>> {
    let mut stmt = conn.prepare(
        "SELECT ciclo_id, usuario_id, proposito, meta_ahorro
         FROM participantes_ciclo WHERE ciclo_id = ?1 AND usuario_id = ?2",
    )?;

    let mut rows = stmt.query_map(params![cycle_id, user_id], |row| {
        Ok(Participant {
            cycle_id: row.get(0)?,
            user_id: row.get(1)?,
            purpose: row.get(2)?,
            savings_goal: row.get(3)?,
        })
    })?;

    match rows.next() {
        Some(p) => Ok(Some(p.context("Failed to read participant row")?)),
        None => Ok(None),
    }
}

pub fn update_participant(conn: &Connection, participant: &Participant) -> Result<()> {
    ensure_valid(validate_participant(participant))?;

    let updated = conn
        .execute(
            "UPDATE participantes_ciclo SET proposito = ?1, meta_ahorro = ?2
             WHERE ciclo_id = ?3 AND usuario_id = ?4",
            params![
                participant.purpose,
                participant.savings_goal,
                participant.cycle_id,
                participant.user_id,
            ],
        )
        .context("Failed to update participant")?;

    if updated == 0 {
        return Err(anyhow!(
            "No participation for user {} in cycle {}",
            participant.user_id,
            participant.cycle_id
        ));
    }
    Ok(())
}

pub fn insert_movement(conn: &Connection, movement: &Movement) -> Result<i64> {
    ensure_valid(validate_movement(movement))?;

    conn.execute(
        "INSERT INTO movimientos_ahorro (ciclo_id, usuario_id, fecha, monto, nota)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            movement.cycle_id,
            movement.user_id,
            movement.date.format("%Y-%m-%d").to_string(),
            movement.amount,
            movement.note,
        ],
    )
    .context("Failed to insert movement")?;

    Ok(conn.last_insert_rowid())
}

pub fn update_movement(conn: &Connection, movement: &Movement) -> Result<()> {
    ensure_valid(validate_movement(movement))?;

    let updated = conn
        .execute(
            "UPDATE movimientos_ahorro SET fecha = ?1, monto = ?2, nota = ?3 WHERE id = ?4",
            params![
                movement.date.format("%Y-%m-%d").to_string(),
                movement.amount,
                movement.note,
                movement.id,
            ],
        )
        .context("Failed to update movement")?;

    if updated == 0 {
        return Err(anyhow!("Movement {} not found", movement.id));
    }
    Ok(())
}

pub fn delete_movement(conn: &Connection, movement_id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM movimientos_ahorro WHERE id = ?1",
        params![movement_id],
    )
    .context("Failed to delete movement")?;
    Ok(())
}

pub fn get_movements(conn: &Connection, cycle_id: i64, user_id: &str) -> Result<Vec<Movement>> {
    let mut stmt = conn.prepare(
        "SELECT id, ciclo_id, usuario_id, fecha, monto, nota
         FROM movimientos_ahorro WHERE ciclo_id = ?1 AND usuario_id = ?2
         ORDER BY fecha DESC, id DESC",
    )?;

    let rows = stmt.query_map(params![cycle_id, user_id], |row| {
        let fecha: String = row.get(3)?;
        Ok(Movement {
            id: row.get(0)?,
            cycle_id: row.get(1)?,
            user_id: row.get(2)?,
            date: NaiveDate::parse_from_str(&fecha, "%Y-%m-%d")
                .map_err(|_| rusqlite::Error::InvalidQuery)?,
            amount: row.get(4)?,
            note: row.get(5)?,
        })
    })?;

    let mut movements = Vec::new();
    for row in rows {
        movements.push(row.context("Failed to read movement row")?);
    }
    Ok(movements)
}

/// Remove a saver from a cycle: delete their movements, then their
/// participation row. The two steps are not atomic; a failure in the first
/// aborts before the second so the error surfaces instead of continuing.
pub fn leave_cycle(conn: &Connection, cycle_id: i64, user_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM movimientos_ahorro WHERE ciclo_id = ?1 AND usuario_id = ?2",
        params![cycle_id, user_id],
    )
    .context("Failed to delete movements while leaving cycle")?;

    conn.execute(
        "DELETE FROM participantes_ciclo WHERE ciclo_id = ?1 AND usuario_id = ?2",
        params![cycle_id, user_id],
    )
    .context("Failed to delete participation while leaving cycle")?;

    Ok(())
}

// ============================================================================
// CSV IMPORT
// ============================================================================

pub fn load_groups_csv(csv_path: &Path) -> Result<Vec<SavingsGroup>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open groups CSV")?;

    let mut groups = Vec::new();
    for result in rdr.deserialize() {
        let group: SavingsGroup = result.context("Failed to deserialize group row")?;
        groups.push(group);
    }
    Ok(groups)
}

pub fn load_reports_csv(csv_path: &Path) -> Result<Vec<MonthlyReport>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open reports CSV")?;

    let mut reports = Vec::new();
    for result in rdr.deserialize() {
        let report: MonthlyReport = result.context("Failed to deserialize report row")?;
        reports.push(report);
    }
    Ok(reports)
}

/// Outcome of an idempotent bulk insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportStats {
    pub inserted: usize,
    pub duplicates: usize,
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Insert groups, skipping rows whose idempotency hash already exists, so
/// re-running an import never duplicates or renumbers.
pub fn import_groups(conn: &Connection, groups: &[SavingsGroup]) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for group in groups {
        ensure_valid(validate_group(group))?;

        let result = conn.execute(
            "INSERT INTO grupos_ahorro (
                idempotency_hash, nombre_grupo, pais_operacion, ciudad_operacion, zona_operacion,
                numero_total_miembros, cantidad_hombres, cantidad_mujeres, cantidad_ninos,
                cantidad_ninas, tipo_ahorro, grupo_juvenil, duracion_ciclo, ano_creacion,
                mes_creacion, facilitador_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                group.compute_idempotency_hash(),
                group.name,
                group.country,
                group.city,
                group.zone,
                group.total_members,
                group.men,
                group.women,
                group.boys,
                group.girls,
                group.savings_type.as_str(),
                group.youth_group as i64,
                group.cycle_duration,
                group.creation_year,
                group.creation_month,
                group.facilitator_id,
            ],
        );

        match result {
            Ok(_) => stats.inserted += 1,
            Err(e) if is_constraint_violation(&e) => stats.duplicates += 1,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(stats)
}

/// Insert reports with the same duplicate-skipping rule. Two different
/// reports for the same (group, year, month) both survive: amendments are
/// new rows, only byte-identical rows are skipped.
pub fn import_reports(conn: &Connection, reports: &[MonthlyReport]) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for report in reports {
        ensure_valid(validate_report(report))?;

        let result = conn.execute(
            "INSERT INTO reportes_grupos (
                idempotency_hash, grupo_id, facilitador_id, ano, mes, numero_reuniones,
                promedio_asistencia, cantidad_ahorrada, comentarios, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                report.compute_idempotency_hash(),
                report.group_id,
                report.facilitator_id,
                report.year,
                report.month,
                report.meeting_count,
                report.average_attendance,
                report.amount_saved,
                report.comments,
                report.created_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => stats.inserted += 1,
            Err(e) if is_constraint_violation(&e) => stats.duplicates += 1,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(stats)
}

// ============================================================================
// TESTS
// ============================================================================
