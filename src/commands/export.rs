use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::db::Database;
use crate::models::{Notification, Ticket};

#[derive(Serialize, Deserialize)]
pub struct ExportedTicket {
    pub id: i64,
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub customer_name: String,
    pub consumer_number: String,
    pub zone: String,
    pub assigned_to: Option<String>,
    pub remarks: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub escalated_at: Option<String>,
    pub resolved_at: Option<String>,
    pub closed_at: Option<String>,
    pub feedback: Option<ExportedFeedback>,
}

#[derive(Serialize, Deserialize)]
pub struct ExportedFeedback {
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct ExportedNotification {
    pub id: i64,
    pub kind: String,
    pub message: String,
    pub ticket_number: String,
    pub target_roles: Vec<String>,
    pub unread: bool,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct ExportData {
    pub version: i32,
    pub exported_at: String,
    pub tickets: Vec<ExportedTicket>,
    pub notifications: Vec<ExportedNotification>,
}

fn export_ticket(db: &Database, ticket: &Ticket) -> Result<ExportedTicket> {
    let feedback = db.get_feedback(ticket.id)?.map(|f| ExportedFeedback {
        rating: f.rating,
        comment: f.comment,
        created_at: f.created_at.to_rfc3339(),
    });

    Ok(ExportedTicket {
        id: ticket.id,
        ticket_number: ticket.ticket_number.clone(),
        title: ticket.title.clone(),
        description: ticket.description.clone(),
        category: ticket.category.to_string(),
        priority: ticket.priority.to_string(),
        status: ticket.status.to_string(),
        customer_name: ticket.customer_name.clone(),
        consumer_number: ticket.consumer_number.clone(),
        zone: ticket.zone.clone(),
        assigned_to: ticket.assigned_to.clone(),
        remarks: ticket.remarks.clone(),
        created_at: ticket.created_at.to_rfc3339(),
        updated_at: ticket.updated_at.to_rfc3339(),
        escalated_at: ticket.escalated_at.map(|dt| dt.to_rfc3339()),
        resolved_at: ticket.resolved_at.map(|dt| dt.to_rfc3339()),
        closed_at: ticket.closed_at.map(|dt| dt.to_rfc3339()),
        feedback,
    })
}

fn export_notification(n: &Notification) -> ExportedNotification {
    ExportedNotification {
        id: n.id,
        kind: n.kind.to_string(),
        message: n.message.clone(),
        ticket_number: n.ticket_number.clone(),
        target_roles: n.target_roles.iter().map(|r| r.to_string()).collect(),
        unread: n.unread,
        created_at: n.created_at.to_rfc3339(),
    }
}

pub fn run(db: &Database, output: Option<&Path>) -> Result<()> {
    let tickets = db
        .list_tickets(None, None, None)?
        .iter()
        .map(|t| export_ticket(db, t))
        .collect::<Result<Vec<_>>>()?;

    let notifications = db
        .list_notifications()?
        .iter()
        .map(export_notification)
        .collect();

    let data = ExportData {
        version: 1,
        exported_at: Utc::now().to_rfc3339(),
        tickets,
        notifications,
    };

    let json = serde_json::to_string_pretty(&data)?;

    match output {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Exported {} ticket(s) and {} notification(s) to {}",
                data.tickets.len(),
                data.notifications.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}
