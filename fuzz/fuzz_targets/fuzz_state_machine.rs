#![no_main]

//! Fuzz target for the ticket status state machine.
//!
//! Applies an arbitrary sequence of status changes to one ticket and checks
//! the engine against a shadow model of the transition table: a change
//! succeeds exactly when the table allows it, priority never changes, and
//! escalated_at is set exactly when the ticket has passed through Escalated.

use arbitrary::Arbitrary;
use chrono::Utc;
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

use gridline::db::Database;
use gridline::engine::{transition_allowed, Engine};
use gridline::models::{Category, NewTicket, Priority, TicketStatus};

#[derive(Arbitrary, Debug)]
struct MachineInput {
    transitions: Vec<u8>,
}

fn status_from(byte: u8) -> TicketStatus {
    match byte % 5 {
        0 => TicketStatus::Open,
        1 => TicketStatus::InProgress,
        2 => TicketStatus::Resolved,
        3 => TicketStatus::Closed,
        _ => TicketStatus::Escalated,
    }
}

fuzz_target!(|input: MachineInput| {
    let dir = match tempdir() {
        Ok(d) => d,
        Err(_) => return,
    };
    let db_path = dir.path().join("tickets.db");

    let db = match Database::open(&db_path) {
        Ok(d) => d,
        Err(_) => return,
    };
    let engine = Engine::new(&db);
    let now = Utc::now();

    let ticket = match engine.create_ticket(
        NewTicket {
            customer_name: "Fuzz Customer".to_string(),
            consumer_number: "KA000000000000".to_string(),
            title: "Fuzzed lifecycle".to_string(),
            description: "Driven by arbitrary transitions".to_string(),
            category: Category::GeneralQuery,
            priority: Priority::Medium,
            zone: "Fuzz Zone".to_string(),
        },
        now,
    ) {
        Ok(t) => t,
        Err(_) => return,
    };

    let mut current = TicketStatus::Open;
    let mut ever_escalated = false;

    for byte in input.transitions.iter().take(32) {
        let to = status_from(*byte);
        let allowed = transition_allowed(current, to);

        let result = engine.update_status(ticket.id, to, None, now);
        assert_eq!(result.is_ok(), allowed);

        if allowed {
            current = to;
            if to == TicketStatus::Escalated {
                ever_escalated = true;
            }
        }

        let stored = db.get_ticket(ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, current);
        assert_eq!(stored.priority, Priority::Medium);
        assert_eq!(stored.escalated_at.is_some(), ever_escalated);
    }
});
