use anyhow::{bail, Result};
use chrono::Utc;
use std::str::FromStr;

use crate::db::Database;
use crate::engine::{self, sla_status};
use crate::models::{Category, Priority, Role, TicketStatus, Viewer};

#[allow(clippy::too_many_arguments)]
pub fn run(
    db: &Database,
    status: &str,
    priority: Option<&str>,
    category: Option<&str>,
    role: &str,
    consumer_number: Option<String>,
    zone: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let status_filter = if status == "all" {
        None
    } else {
        match TicketStatus::from_str(status) {
            Ok(s) => Some(s),
            Err(e) => bail!("{}", e),
        }
    };

    let priority_filter = match priority {
        Some(p) => match Priority::from_str(p) {
            Ok(p) => Some(p),
            Err(e) => bail!("{}", e),
        },
        None => None,
    };

    let category_filter = match category {
        Some(c) => match Category::from_str(c) {
            Ok(c) => Some(c),
            Err(e) => bail!("{}", e),
        },
        None => None,
    };

    let viewer = build_viewer(role, consumer_number, zone, name)?;

    let mut tickets = db.list_tickets(status_filter, priority_filter, category_filter)?;
    tickets.retain(|t| engine::visible_to(t, &viewer));

    if tickets.is_empty() {
        println!("No tickets found.");
        return Ok(());
    }

    let now = Utc::now();
    for ticket in tickets {
        let sla = sla_status(&ticket, now);
        println!(
            "#{:<4} {:10} {:14} {:<32} {:8} {:8} {}",
            ticket.id,
            ticket.ticket_number,
            format!("[{}]", ticket.status),
            truncate(&ticket.title, 32),
            ticket.priority,
            sla.health,
            ticket.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

pub fn build_viewer(
    role: &str,
    consumer_number: Option<String>,
    zone: Option<String>,
    name: Option<String>,
) -> Result<Viewer> {
    let role = match Role::from_str(role) {
        Ok(r) => r,
        Err(e) => bail!("{}", e),
    };

    match role {
        Role::Consumer if consumer_number.is_none() => {
            bail!("Provide --consumer-number with --role consumer")
        }
        Role::SiteEngineer if zone.is_none() && name.is_none() => {
            bail!("Provide --zone or --name with --role site-engineer")
        }
        _ => {}
    }

    Ok(Viewer {
        role,
        name,
        consumer_number,
        zone,
    })
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    #[test]
    fn test_list_empty_store() {
        let (db, _dir) = setup_test_db();
        let result = run(&db, "all", None, None, "department_head", None, None, None);
        assert!(result.is_ok());
    }

    #[test]
    fn test_list_rejects_unknown_role() {
        let (db, _dir) = setup_test_db();
        let result = run(&db, "all", None, None, "manager", None, None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_consumer_requires_consumer_number() {
        let (db, _dir) = setup_test_db();
        let result = run(&db, "all", None, None, "consumer", None, None, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("--consumer-number"));
    }

    #[test]
    fn test_engineer_requires_zone_or_name() {
        let (db, _dir) = setup_test_db();
        let result = run(&db, "all", None, None, "site-engineer", None, None, None);
        assert!(result.is_err());

        let result = run(
            &db,
            "all",
            None,
            None,
            "site-engineer",
            None,
            Some("Hubli Zone".to_string()),
            None,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long ticket title here", 10), "a very ...");

        // Multi-byte characters must not be split mid-codepoint
        let truncated = truncate("ವಿದ್ಯುತ್ ಕಡಿತ ದೂರು ಇಲ್ಲಿದೆ", 10);
        assert!(truncated.ends_with("..."));
        assert!(truncated.chars().count() <= 10);
    }
}
