use anyhow::{bail, Result};
use chrono::Utc;
use std::str::FromStr;

use crate::db::Database;
use crate::engine::Engine;
use crate::models::TicketStatus;

pub fn run(db: &Database, id: i64, status: &str, remarks: Option<&str>) -> Result<()> {
    let to = match TicketStatus::from_str(status) {
        Ok(s) => s,
        Err(e) => bail!("{}", e),
    };

    let engine = Engine::new(db);
    let ticket = engine.update_status(id, to, remarks, Utc::now())?;
    println!(
        "Ticket #{} ({}) is now {}",
        ticket.id, ticket.ticket_number, ticket.status
    );
    Ok(())
}

/// Department-head approval of an escalated ticket.
pub fn approve(db: &Database, id: i64, remarks: Option<&str>) -> Result<()> {
    let engine = Engine::new(db);
    let ticket = engine.update_status(id, TicketStatus::Resolved, remarks, Utc::now())?;
    println!(
        "Approved ticket #{} ({}): resolved",
        ticket.id, ticket.ticket_number
    );
    Ok(())
}

/// Department-head rejection of an escalated ticket: back to open.
pub fn reject(db: &Database, id: i64, remarks: Option<&str>) -> Result<()> {
    let engine = Engine::new(db);
    let ticket = engine.update_status(id, TicketStatus::Open, remarks, Utc::now())?;
    println!(
        "Rejected ticket #{} ({}): reopened",
        ticket.id, ticket.ticket_number
    );
    Ok(())
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

    fn make_ticket(db: &Database) -> i64 {
        db.insert_ticket(
            &NewTicket {
                customer_name: "Asha Patil".to_string(),
                consumer_number: "KA001234567890".to_string(),
                title: "Power outage".to_string(),
                description: "No supply since morning".to_string(),
                category: Category::Complaint,
                priority: Priority::High,
                zone: "Hubli Zone".to_string(),
            },
            Utc::now(),
        )
        .unwrap()
        .id
    }

    #[test]
    fn test_status_walks_the_lifecycle() {
        let (db, _dir) = setup_test_db();
        let id = make_ticket(&db);

        run(&db, id, "in-progress", None).unwrap();
        run(&db, id, "resolved", Some("Fuse replaced")).unwrap();
        run(&db, id, "closed", None).unwrap();

        let ticket = db.get_ticket(id).unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Closed);
    }

    #[test]
    fn test_status_rejects_closed_to_open() {
        let (db, _dir) = setup_test_db();
        let id = make_ticket(&db);
        run(&db, id, "in-progress", None).unwrap();
        run(&db, id, "resolved", None).unwrap();
        run(&db, id, "closed", None).unwrap();

        let result = run(&db, id, "open", None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Cannot move ticket"));
    }

    #[test]
    fn test_status_rejects_unknown_word() {
        let (db, _dir) = setup_test_db();
        let id = make_ticket(&db);

        let result = run(&db, id, "done", None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid status"));
    }

    #[test]
    fn test_approve_requires_escalated() {
        let (db, _dir) = setup_test_db();
        let id = make_ticket(&db);

        // Open -> Resolved is not in the table
        assert!(approve(&db, id, None).is_err());

        run(&db, id, "escalated", None).unwrap();
        approve(&db, id, Some("Verified on site")).unwrap();
        assert_eq!(
            db.get_ticket(id).unwrap().unwrap().status,
            TicketStatus::Resolved
        );
    }

    #[test]
    fn test_reject_reopens_escalated() {
        let (db, _dir) = setup_test_db();
        let id = make_ticket(&db);
        run(&db, id, "escalated", None).unwrap();

        reject(&db, id, Some("Crew never visited")).unwrap();

        let ticket = db.get_ticket(id).unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.escalated_at.is_some());
        assert_eq!(ticket.remarks.as_deref(), Some("Crew never visited"));
    }
}
