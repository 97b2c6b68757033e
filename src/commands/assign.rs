use anyhow::Result;
use chrono::Utc;

use crate::db::Database;
use crate::engine::Engine;

pub fn run(db: &Database, id: i64, engineer: &str) -> Result<()> {
    let engine = Engine::new(db);
    let ticket = engine.assign(id, engineer, Utc::now())?;
    println!(
        "Assigned ticket #{} ({}) to {}",
        ticket.id,
        ticket.ticket_number,
        engineer
    );
    Ok(())
}
