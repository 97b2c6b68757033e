use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::str::FromStr;

use crate::models::{
    Category, Feedback, NewTicket, Notification, NotificationKind, Priority, Role, Ticket,
    TicketStatus,
};

const SCHEMA_VERSION: i32 = 1;

const TICKET_COLUMNS: &str = "id, ticket_number, title, description, category, priority, status, \
     customer_name, consumer_number, zone, assigned_to, remarks, \
     created_at, updated_at, escalated_at, escalated_to, resolved_at, closed_at";

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

    fn init_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM pragma_user_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if version < SCHEMA_VERSION {
            self.conn.execute_batch(
                r#"
                -- Tickets are append-and-update only; rows are never deleted
                CREATE TABLE IF NOT EXISTS tickets (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ticket_number TEXT NOT NULL DEFAULT '',
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    category TEXT NOT NULL,
                    priority TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'open',
                    customer_name TEXT NOT NULL,
                    consumer_number TEXT NOT NULL,
                    zone TEXT NOT NULL,
                    assigned_to TEXT,
                    remarks TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    escalated_at TEXT,
                    escalated_to TEXT,
                    resolved_at TEXT,
                    closed_at TEXT
                );

                -- Append-only event log; only the unread flag is ever mutated
                CREATE TABLE IF NOT EXISTS notifications (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    kind TEXT NOT NULL,
                    message TEXT NOT NULL,
                    ticket_id INTEGER NOT NULL,
                    ticket_number TEXT NOT NULL,
                    target_roles TEXT NOT NULL,
                    unread INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (ticket_id) REFERENCES tickets(id)
                );

                -- At most one feedback record per ticket
                CREATE TABLE IF NOT EXISTS feedback (
                    ticket_id INTEGER PRIMARY KEY,
                    rating INTEGER NOT NULL,
                    comment TEXT,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (ticket_id) REFERENCES tickets(id)
                );

                -- Indexes
                CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
                CREATE INDEX IF NOT EXISTS idx_tickets_priority ON tickets(priority);
                CREATE INDEX IF NOT EXISTS idx_tickets_zone ON tickets(zone);
                CREATE INDEX IF NOT EXISTS idx_tickets_consumer ON tickets(consumer_number);
                CREATE INDEX IF NOT EXISTS idx_notifications_ticket ON notifications(ticket_id);
                "#,
            )?;

            self.conn
                .execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        }

        // Enable foreign keys
        self.conn.execute("PRAGMA foreign_keys = ON", [])?;

        Ok(())
    }

    /// Run several statements as one atomic step. Callers see either all of
    /// the writes or none of them.
    pub fn with_tx<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    // Tickets

    pub fn insert_ticket(&self, new: &NewTicket, now: DateTime<Utc>) -> Result<Ticket> {
        let now_str = now.to_rfc3339();
        self.conn.execute(
            "INSERT INTO tickets (title, description, category, priority, status, \
             customer_name, consumer_number, zone, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, 'open', ?5, ?6, ?7, ?8, ?8)",
            params![
                new.title,
                new.description,
                new.category.as_str(),
                new.priority.as_str(),
                new.customer_name,
                new.consumer_number,
                new.zone,
                now_str
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        // Human-readable number follows the rowid, which is monotonic because
        // tickets are never deleted
        self.conn.execute(
            "UPDATE tickets SET ticket_number = printf('TKT-%05d', id) WHERE id = ?1",
            [id],
        )?;

        self.get_ticket(id)?
            .context("Ticket missing immediately after insert")
    }

    pub fn get_ticket(&self, id: i64) -> Result<Option<Ticket>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tickets WHERE id = ?1",
            TICKET_COLUMNS
        ))?;

        let ticket = stmt.query_row([id], row_to_ticket).ok();

        Ok(ticket)
    }

    pub fn list_tickets(
        &self,
        status_filter: Option<TicketStatus>,
        priority_filter: Option<Priority>,
        category_filter: Option<Category>,
    ) -> Result<Vec<Ticket>> {
        let mut sql = format!("SELECT {} FROM tickets", TICKET_COLUMNS);
        let mut conditions = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = status_filter {
            conditions.push(format!("status = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(status.as_str().to_string()));
        }

        if let Some(priority) = priority_filter {
            conditions.push(format!("priority = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(priority.as_str().to_string()));
        }

        if let Some(category) = category_filter {
            conditions.push(format!("category = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(category.as_str().to_string()));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        sql.push_str(" ORDER BY id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let tickets = stmt
            .query_map(params_refs.as_slice(), row_to_ticket)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tickets)
    }

    /// Tickets the escalation sweep has to look at: Open or In Progress.
    pub fn list_active_tickets(&self) -> Result<Vec<Ticket>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tickets WHERE status IN ('open', 'in_progress') ORDER BY id",
            TICKET_COLUMNS
        ))?;

        let tickets = stmt
            .query_map([], row_to_ticket)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tickets)
    }

    pub fn set_status(
        &self,
        id: i64,
        to: TicketStatus,
        remarks: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        // escalated_at is written through COALESCE: set once, never cleared
        let extra = match to {
            TicketStatus::Escalated => {
                ", escalated_at = COALESCE(escalated_at, ?1), escalated_to = 'Department Head'"
            }
            TicketStatus::Resolved => ", resolved_at = ?1",
            TicketStatus::Closed => ", closed_at = ?1",
            _ => "",
        };

        let sql = format!(
            "UPDATE tickets SET status = ?2, remarks = COALESCE(?3, remarks), updated_at = ?1{} \
             WHERE id = ?4",
            extra
        );

        let rows = self
            .conn
            .execute(&sql, params![now.to_rfc3339(), to.as_str(), remarks, id])?;
        Ok(rows > 0)
    }

    /// Conditional escalation write. The status guard in the WHERE clause is
    /// what makes the sweep idempotent: a ticket that is already Escalated
    /// (or was resolved between the read and this write) matches zero rows.
    pub fn mark_escalated(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE tickets SET status = 'escalated', \
             escalated_at = COALESCE(escalated_at, ?1), \
             escalated_to = 'Department Head', updated_at = ?1 \
             WHERE id = ?2 AND status IN ('open', 'in_progress')",
            params![now.to_rfc3339(), id],
        )?;
        Ok(rows > 0)
    }

    pub fn assign_ticket(&self, id: i64, engineer: &str, now: DateTime<Utc>) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE tickets SET assigned_to = ?1, updated_at = ?2 WHERE id = ?3",
            params![engineer, now.to_rfc3339(), id],
        )?;
        Ok(rows > 0)
    }

    // Notifications

    pub fn insert_notification(
        &self,
        kind: NotificationKind,
        message: &str,
        ticket_id: i64,
        ticket_number: &str,
        target_roles: &[Role],
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let roles = target_roles
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(",");

        self.conn.execute(
            "INSERT INTO notifications (kind, message, ticket_id, ticket_number, target_roles, unread, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![
                kind.as_str(),
                message,
                ticket_id,
                ticket_number,
                roles,
                now.to_rfc3339()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_notifications(&self) -> Result<Vec<Notification>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, message, ticket_id, ticket_number, target_roles, unread, created_at \
             FROM notifications ORDER BY id DESC",
        )?;

        let notifications = stmt
            .query_map([], row_to_notification)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notifications)
    }

    pub fn mark_notification_read(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("UPDATE notifications SET unread = 0 WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    // Feedback

    pub fn insert_feedback(
        &self,
        ticket_id: i64,
        rating: u8,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO feedback (ticket_id, rating, comment, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![ticket_id, rating, comment, now.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_feedback(&self, ticket_id: i64) -> Result<Option<Feedback>> {
        let mut stmt = self.conn.prepare(
            "SELECT ticket_id, rating, comment, created_at FROM feedback WHERE ticket_id = ?1",
        )?;

        let feedback = stmt
            .query_row([ticket_id], |row| {
                Ok(Feedback {
                    ticket_id: row.get(0)?,
                    rating: row.get(1)?,
                    comment: row.get(2)?,
                    created_at: parse_datetime(row.get::<_, String>(3)?),
                })
            })
            .ok();

        Ok(feedback)
    }
}

fn row_to_ticket(row: &Row) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        ticket_number: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        category: parse_enum(row.get::<_, String>(4)?, 4)?,
        priority: parse_enum(row.get::<_, String>(5)?, 5)?,
        status: parse_enum(row.get::<_, String>(6)?, 6)?,
        customer_name: row.get(7)?,
        consumer_number: row.get(8)?,
        zone: row.get(9)?,
        assigned_to: row.get(10)?,
        remarks: row.get(11)?,
        created_at: parse_datetime(row.get::<_, String>(12)?),
        updated_at: parse_datetime(row.get::<_, String>(13)?),
        escalated_at: row.get::<_, Option<String>>(14)?.map(parse_datetime),
        escalated_to: row.get(15)?,
        resolved_at: row.get::<_, Option<String>>(16)?.map(parse_datetime),
        closed_at: row.get::<_, Option<String>>(17)?.map(parse_datetime),
    })
}

fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    let roles: String = row.get(5)?;
    Ok(Notification {
        id: row.get(0)?,
        kind: parse_enum(row.get::<_, String>(1)?, 1)?,
        message: row.get(2)?,
        ticket_id: row.get(3)?,
        ticket_number: row.get(4)?,
        target_roles: roles
            .split(',')
            .filter_map(|s| Role::from_str(s).ok())
            .collect(),
        unread: row.get::<_, i64>(6)? != 0,
        created_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

fn parse_enum<T: FromStr>(s: String, idx: usize) -> rusqlite::Result<T> {
    T::from_str(&s).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognized value '{}'", s).into(),
        )
    })
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, NewTicket, Priority};
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    fn sample_ticket(priority: Priority) -> NewTicket {
        NewTicket {
            customer_name: "Asha Patil".to_string(),
            consumer_number: "KA001234567890".to_string(),
            title: "Power outage on 4th Cross".to_string(),
            description: "No supply since morning".to_string(),
            category: Category::Complaint,
            priority,
            zone: "Hubli Zone".to_string(),
        }
    }

    #[test]
    fn test_ticket_numbers_are_sequential() {
        let (db, _dir) = setup_test_db();
        let now = Utc::now();
        let t1 = db.insert_ticket(&sample_ticket(Priority::High), now).unwrap();
        let t2 = db.insert_ticket(&sample_ticket(Priority::Low), now).unwrap();

        assert_eq!(t1.ticket_number, "TKT-00001");
        assert_eq!(t2.ticket_number, "TKT-00002");
    }

    #[test]
    fn test_get_missing_ticket_is_none() {
        let (db, _dir) = setup_test_db();
        assert!(db.get_ticket(42).unwrap().is_none());
    }

    #[test]
    fn test_tickets_survive_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let now = Utc::now();

        let id = {
            let db = Database::open(&db_path).unwrap();
            db.insert_ticket(&sample_ticket(Priority::Medium), now)
                .unwrap()
                .id
        };

        let db = Database::open(&db_path).unwrap();
        let ticket = db.get_ticket(id).unwrap().unwrap();
        assert_eq!(ticket.priority, Priority::Medium);
        assert_eq!(ticket.status, TicketStatus::Open);
    }

    #[test]
    fn test_mark_escalated_is_conditional() {
        let (db, _dir) = setup_test_db();
        let now = Utc::now();
        let ticket = db.insert_ticket(&sample_ticket(Priority::High), now).unwrap();

        assert!(db.mark_escalated(ticket.id, now).unwrap());
        // Already escalated: the guard matches nothing
        assert!(!db.mark_escalated(ticket.id, now).unwrap());
    }

    #[test]
    fn test_escalated_at_set_once() {
        let (db, _dir) = setup_test_db();
        let t0 = Utc::now();
        let ticket = db.insert_ticket(&sample_ticket(Priority::High), t0).unwrap();

        db.mark_escalated(ticket.id, t0).unwrap();
        let first = db.get_ticket(ticket.id).unwrap().unwrap().escalated_at;

        // Reject back to open, escalate again later: timestamp is unchanged
        db.set_status(ticket.id, TicketStatus::Open, None, t0).unwrap();
        let later = t0 + chrono::Duration::hours(48);
        db.mark_escalated(ticket.id, later).unwrap();

        let second = db.get_ticket(ticket.id).unwrap().unwrap().escalated_at;
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_feedback_rejected_by_schema() {
        let (db, _dir) = setup_test_db();
        let now = Utc::now();
        let ticket = db.insert_ticket(&sample_ticket(Priority::Low), now).unwrap();

        db.insert_feedback(ticket.id, 4, None, now).unwrap();
        assert!(db.insert_feedback(ticket.id, 5, None, now).is_err());
    }

    #[test]
    fn test_notification_roles_round_trip() {
        let (db, _dir) = setup_test_db();
        let now = Utc::now();
        let ticket = db.insert_ticket(&sample_ticket(Priority::High), now).unwrap();

        db.insert_notification(
            NotificationKind::TicketCreated,
            "New ticket",
            ticket.id,
            &ticket.ticket_number,
            &[Role::SiteEngineer, Role::DepartmentHead],
            now,
        )
        .unwrap();

        let all = db.list_notifications().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(
            all[0].target_roles,
            vec![Role::SiteEngineer, Role::DepartmentHead]
        );
        assert!(all[0].unread);
    }
}
