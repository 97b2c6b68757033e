use anyhow::Result;
use chrono::Utc;

use crate::commands::list::truncate;
use crate::db::Database;
use crate::engine::{sla_status, SlaHealth};

pub fn run(db: &Database) -> Result<()> {
    let tickets = db.list_active_tickets()?;

    if tickets.is_empty() {
        println!("No open tickets.");
        return Ok(());
    }

    let now = Utc::now();
    let mut on_time = 0;
    let mut at_risk = 0;
    let mut breached = 0;

    for ticket in &tickets {
        let sla = sla_status(ticket, now);
        match sla.health {
            SlaHealth::OnTime => on_time += 1,
            SlaHealth::AtRisk => at_risk += 1,
            SlaHealth::Breached => breached += 1,
            SlaHealth::Resolved => {}
        }

        let elapsed_hours = (now - ticket.created_at).num_minutes() as f64 / 60.0;
        println!(
            "{:10} {:8} {:>6.1}%  {:8} {:>6.1}h/{}h  {}",
            ticket.ticket_number,
            ticket.priority,
            sla.percentage,
            sla.health,
            elapsed_hours,
            ticket.priority.sla_hours(),
            truncate(&ticket.title, 32)
        );
    }

    println!();
    println!(
        "{} open: {} on time, {} at risk, {} breached",
        tickets.len(),
        on_time,
        at_risk,
        breached
    );
    if breached > 0 {
        println!("Run 'gridline sweep' to escalate breached tickets now.");
    }

    Ok(())
}
