use anyhow::Result;
use chrono::Utc;

use crate::db::Database;
use crate::engine::Engine;

pub fn run(db: &Database) -> Result<()> {
    let engine = Engine::new(db);
    let escalated = engine.sweep(Utc::now())?;

    if escalated.is_empty() {
        println!("Sweep complete. Nothing to escalate.");
        return Ok(());
    }

    for ticket in &escalated {
        println!(
            "Escalated #{} ({}) [{}] {}",
            ticket.id, ticket.ticket_number, ticket.priority, ticket.title
        );
    }
    println!(
        "{} ticket(s) escalated. Department head notified.",
        escalated.len()
    );

    Ok(())
}
