use anyhow::{bail, Result};
use chrono::Utc;

use crate::db::Database;
use crate::engine::sla_status;

pub fn run(db: &Database, id: i64) -> Result<()> {
    let ticket = match db.get_ticket(id)? {
        Some(t) => t,
        None => bail!("Ticket #{} not found", id),
    };

    println!(
        "Ticket #{} ({}): {}",
        ticket.id, ticket.ticket_number, ticket.title
    );
    println!("Status: {}", ticket.status);
    println!("Priority: {}", ticket.priority);
    println!("Category: {}", ticket.category);
    println!("Customer: {} ({})", ticket.customer_name, ticket.consumer_number);
    println!("Zone: {}", ticket.zone);
    if let Some(engineer) = &ticket.assigned_to {
        println!("Assigned to: {}", engineer);
    }
    println!("Created: {}", ticket.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", ticket.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(escalated) = ticket.escalated_at {
        let to = ticket.escalated_to.as_deref().unwrap_or("Department Head");
        println!(
            "Escalated: {} (to {})",
            escalated.format("%Y-%m-%d %H:%M:%S"),
            to
        );
    }
    if let Some(resolved) = ticket.resolved_at {
        println!("Resolved: {}", resolved.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(closed) = ticket.closed_at {
        println!("Closed: {}", closed.format("%Y-%m-%d %H:%M:%S"));
    }

    let sla = sla_status(&ticket, Utc::now());
    println!(
        "SLA: {} ({:.1}% of the {}h window)",
        sla.health,
        sla.percentage,
        ticket.priority.sla_hours()
    );

    if !ticket.description.is_empty() {
        println!("\nDescription:");
        for line in ticket.description.lines() {
            println!("  {}", line);
        }
    }

    if let Some(remarks) = &ticket.remarks {
        println!("\nRemarks:");
        for line in remarks.lines() {
            println!("  {}", line);
        }
    }

    if let Some(feedback) = db.get_feedback(id)? {
        println!("\nFeedback: {}/5", feedback.rating);
        if let Some(comment) = &feedback.comment {
            println!("  {}", comment);
        }
    }

    Ok(())
}
