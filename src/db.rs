use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::debug;

use crate::models::{
    Category, CategoryBreakdown, NewTicket, Priority, PriorityBreakdown, SortField, SortKey,
    Status, Ticket, TicketFilter, TicketStats, TicketUpdate,
};

const SCHEMA_VERSION: i32 = 1;

const TICKET_COLUMNS: &str =
    "id, title, description, category, priority, status, created_at, ai_response";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap_or(0);

        if version < SCHEMA_VERSION {
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS tickets (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL CHECK (length(title) <= 200),
                    description TEXT NOT NULL,
                    category TEXT NOT NULL DEFAULT 'general'
                        CHECK (category IN ('billing', 'technical', 'account', 'general')),
                    priority TEXT NOT NULL DEFAULT 'medium'
                        CHECK (priority IN ('low', 'medium', 'high', 'critical')),
                    status TEXT NOT NULL DEFAULT 'open'
                        CHECK (status IN ('open', 'in_progress', 'resolved', 'closed')),
                    created_at TEXT NOT NULL,
                    ai_response TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
                CREATE INDEX IF NOT EXISTS idx_tickets_priority ON tickets(priority);
                CREATE INDEX IF NOT EXISTS idx_tickets_category ON tickets(category);
                CREATE INDEX IF NOT EXISTS idx_tickets_created_at ON tickets(created_at);
                "#,
            )?;

            self.conn
                .execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        }

        Ok(())
    }

    /// Inserts a ticket stamped with the current time. Status always starts `open`.
    pub fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket> {
        self.insert_ticket(ticket, Utc::now())
    }

    pub(crate) fn insert_ticket(&self, ticket: &NewTicket, created_at: DateTime<Utc>) -> Result<Ticket> {
        self.conn
            .execute(
                "INSERT INTO tickets (title, description, category, priority, status, created_at, ai_response) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    ticket.title,
                    ticket.description,
                    ticket.category.unwrap_or_default(),
                    ticket.priority.unwrap_or_default(),
                    Status::Open,
                    format_datetime(created_at),
                    ticket.ai_response,
                ],
            )
            .context("Failed to insert ticket")?;

        let id = self.conn.last_insert_rowid();
        self.get_ticket(id)?
            .with_context(|| format!("Ticket #{} missing after insert", id))
    }

    pub fn get_ticket(&self, id: i64) -> Result<Option<Ticket>> {
        let sql = format!("SELECT {} FROM tickets WHERE id = ?1", TICKET_COLUMNS);
        let ticket = self
            .conn
            .query_row(&sql, [id], ticket_from_row)
            .optional()?;
        Ok(ticket)
    }

    pub fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let mut sql = format!("SELECT {} FROM tickets", TICKET_COLUMNS);
        let mut conditions = Vec::new();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(category) = filter.category {
            conditions.push("category = ?".to_string());
            params_vec.push(Box::new(category));
        }

        if let Some(priority) = filter.priority {
            conditions.push("priority = ?".to_string());
            params_vec.push(Box::new(priority));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?".to_string());
            params_vec.push(Box::new(status));
        }

        // Every term has to match somewhere in title or description.
        if let Some(search) = filter.search.as_deref() {
            for term in search_terms(search) {
                let pattern = format!("%{}%", escape_like(term));
                conditions.push(
                    "(title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')".to_string(),
                );
                params_vec.push(Box::new(pattern.clone()));
                params_vec.push(Box::new(pattern));
            }
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        sql.push_str(" ORDER BY ");
        sql.push_str(&order_clause(&filter.ordering));

        debug!(%sql, "listing tickets");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let tickets = stmt
            .query_map(params_refs.as_slice(), ticket_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tickets)
    }

    /// Applies only the supplied fields. Returns `None` when no ticket has `id`.
    pub fn update_ticket(&self, id: i64, update: &TicketUpdate) -> Result<Option<Ticket>> {
        if update.is_empty() {
            return self.get_ticket(id);
        }

        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(c) = update.category {
            updates.push(format!("category = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(c));
        }

        if let Some(p) = update.priority {
            updates.push(format!("priority = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(p));
        }

        if let Some(s) = update.status {
            updates.push(format!("status = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(s));
        }

        params_vec.push(Box::new(id));
        let sql = format!(
            "UPDATE tickets SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len()
        );

        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = self.conn.execute(&sql, params_refs.as_slice())?;
        if rows == 0 {
            return Ok(None);
        }
        self.get_ticket(id)
    }

    /// Aggregate counts computed in SQL. Days are UTC calendar days.
    pub fn ticket_stats(&self) -> Result<TicketStats> {
        let (total_tickets, open_tickets, days): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(status = 'open'), 0), COUNT(DISTINCT substr(created_at, 1, 10)) FROM tickets",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let avg_tickets_per_day = if total_tickets > 0 {
            round_one_decimal(total_tickets as f64 / days.max(1) as f64)
        } else {
            0.0
        };

        let mut priority_breakdown = PriorityBreakdown::default();
        let mut stmt = self
            .conn
            .prepare("SELECT priority, COUNT(*) FROM tickets GROUP BY priority")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, Priority>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (priority, count) = row?;
            priority_breakdown.record(priority, count);
        }

        let mut category_breakdown = CategoryBreakdown::default();
        let mut stmt = self
            .conn
            .prepare("SELECT category, COUNT(*) FROM tickets GROUP BY category")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, Category>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (category, count) = row?;
            category_breakdown.record(category, count);
        }

        Ok(TicketStats {
            total_tickets,
            open_tickets,
            avg_tickets_per_day,
            priority_breakdown,
            category_breakdown,
        })
    }
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        priority: row.get(4)?,
        status: row.get(5)?,
        created_at: parse_datetime(6, row.get::<_, String>(6)?)?,
        ai_response: row.get(7)?,
    })
}

fn order_clause(ordering: &[SortKey]) -> String {
    let default = [SortKey {
        field: SortField::CreatedAt,
        descending: true,
    }];
    let keys = if ordering.is_empty() { &default[..] } else { ordering };

    let mut parts: Vec<String> = keys
        .iter()
        .map(|k| {
            let dir = if k.descending { "DESC" } else { "ASC" };
            format!("{} {}", k.field.column(), dir)
        })
        .collect();
    parts.push("id DESC".to_string());
    parts.join(", ")
}

fn search_terms(search: &str) -> impl Iterator<Item = &str> {
    search
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// Formatting rounds the exact binary value half to even, so 1.25 becomes 1.2.
fn round_one_decimal(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

// Fixed width, so text order is chronological and the first ten chars are the day.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
