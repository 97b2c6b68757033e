use anyhow::{bail, Result};
use chrono::Utc;
use std::str::FromStr;

use crate::db::Database;
use crate::engine::Engine;
use crate::models::{Category, NewTicket, Priority};

#[allow(clippy::too_many_arguments)]
pub fn run(
    db: &Database,
    customer: &str,
    consumer_number: &str,
    title: &str,
    description: &str,
    category: &str,
    priority: &str,
    zone: &str,
) -> Result<()> {
    let category = match Category::from_str(category) {
        Ok(c) => c,
        Err(e) => bail!("{}", e),
    };
    let priority = match Priority::from_str(priority) {
        Ok(p) => p,
        Err(e) => bail!("{}", e),
    };

    let engine = Engine::new(db);
    let ticket = engine.create_ticket(
        NewTicket {
            customer_name: customer.to_string(),
            consumer_number: consumer_number.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            category,
            priority,
            zone: zone.to_string(),
        },
        Utc::now(),
    )?;

    println!("Created ticket #{} ({})", ticket.id, ticket.ticket_number);
    println!(
        "Priority: {} (SLA window {}h)",
        ticket.priority,
        ticket.priority.sla_hours()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    fn submit(db: &Database, title: &str, priority: &str) -> Result<()> {
        run(
            db,
            "Asha Patil",
            "KA001234567890",
            title,
            "No supply since morning",
            "complaint",
            priority,
            "Hubli Zone",
        )
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_submit_creates_open_ticket() {
        let (db, _dir) = setup_test_db();

        submit(&db, "Power outage", "high").unwrap();

        let tickets = db.list_tickets(None, None, None).unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].ticket_number, "TKT-00001");
    }

    #[test]
    fn test_submit_rejects_bad_priority() {
        let (db, _dir) = setup_test_db();

        let result = submit(&db, "Power outage", "urgent");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid priority"));
    }

    #[test]
    fn test_submit_rejects_bad_category() {
        let (db, _dir) = setup_test_db();

        let result = run(
            &db,
            "Asha Patil",
            "KA001234567890",
            "Meter tampering next door",
            "Seen after dark",
            "theft",
            "high",
            "Hubli Zone",
        );
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid category"));
    }

    #[test]
    fn test_submit_rejects_empty_title() {
        let (db, _dir) = setup_test_db();

        let result = submit(&db, "  ", "low");
        assert!(result.is_err());
        assert!(db.list_tickets(None, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_submit_accepts_hyphenated_category() {
        let (db, _dir) = setup_test_db();

        run(
            &db,
            "Asha Patil",
            "KA001234567890",
            "Meter tampering next door",
            "Seen after dark",
            "energy-theft",
            "high",
            "Hubli Zone",
        )
        .unwrap();

        let tickets = db.list_tickets(None, None, None).unwrap();
        assert_eq!(tickets[0].category, crate::models::Category::EnergyTheft);
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_submit_any_reasonable_title(title in "[a-zA-Z0-9 ]{1,60}") {
            prop_assume!(!title.trim().is_empty());
            let (db, _dir) = setup_test_db();

            submit(&db, &title, "medium").unwrap();

            let tickets = db.list_tickets(None, None, None).unwrap();
            prop_assert_eq!(tickets.len(), 1);
            prop_assert_eq!(&tickets[0].title, &title);
        }
    }
}
