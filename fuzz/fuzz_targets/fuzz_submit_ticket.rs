#![no_main]

//! Fuzz target for ticket submission and the read paths behind it.
//!
//! Titles, descriptions, names and zones can contain any Unicode. The goal
//! is to catch panics from improper UTF-8 handling and from SLA math on
//! tickets with hostile field contents.

use arbitrary::Arbitrary;
use chrono::Utc;
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

use gridline::db::Database;
use gridline::engine::{sla_status, Engine};
use gridline::models::{Category, NewTicket, Priority};

#[derive(Arbitrary, Debug)]
struct SubmitInput {
    customer_name: String,
    consumer_number: String,
    /// Ticket title - can contain any Unicode
    title: String,
    description: String,
    zone: String,
    priority: u8,
    category: u8,
    num_tickets: u8,
}

fuzz_target!(|input: SubmitInput| {
    let num_tickets = (input.num_tickets % 5).max(1);

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

    let priority = match input.priority % 3 {
        0 => Priority::High,
        1 => Priority::Medium,
        _ => Priority::Low,
    };
    let category = match input.category % 4 {
        0 => Category::Complaint,
        1 => Category::Maintenance,
        2 => Category::EnergyTheft,
        _ => Category::GeneralQuery,
    };

    for i in 0..num_tickets {
        let title = if i == 0 {
            input.title.clone()
        } else {
            format!("{} #{}", input.title, i)
        };

        // Blank required fields are rejected, never a panic
        let _ = engine.create_ticket(
            NewTicket {
                customer_name: input.customer_name.clone(),
                consumer_number: input.consumer_number.clone(),
                title,
                description: input.description.clone(),
                category,
                priority,
                zone: input.zone.clone(),
            },
            now,
        );
    }

    // Exercise the read paths over whatever made it in
    let _ = db.list_tickets(None, None, None);
    for ticket in db.list_active_tickets().unwrap_or_default() {
        let _ = sla_status(&ticket, now);
        let _ = db.get_ticket(ticket.id);
    }

    // A sweep over fresh tickets must be a no-op and must not panic
    let _ = engine.sweep(now);
    let _ = db.list_notifications();
});
