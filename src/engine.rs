//! Ticket lifecycle and SLA escalation.
//!
//! Every operation here is synchronous and atomic: it either commits all of
//! its writes (ticket mutation plus any notification) or none of them. Time
//! is always an explicit argument so tests can drive the clock; production
//! callers pass `Utc::now()`.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::db::Database;
use crate::models::{
    NewTicket, Notification, NotificationKind, Role, Ticket, TicketStatus, Viewer,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Ticket #{0} not found")]
    NotFound(i64),
    #[error("Cannot move ticket from {from} to {to}")]
    InvalidTransition {
        from: TicketStatus,
        to: TicketStatus,
    },
    #[error("{0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaHealth {
    OnTime,
    AtRisk,
    Breached,
    Resolved,
}

impl fmt::Display for SlaHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlaHealth::OnTime => "On Time",
            SlaHealth::AtRisk => "At Risk",
            SlaHealth::Breached => "Breached",
            SlaHealth::Resolved => "Resolved",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SlaReport {
    pub health: SlaHealth,
    pub percentage: f64,
}

/// The transition table. Everything not listed here is rejected.
pub fn transition_allowed(from: TicketStatus, to: TicketStatus) -> bool {
    use TicketStatus::*;
    matches!(
        (from, to),
        (Open, InProgress)
            | (Open, Escalated)
            | (InProgress, Escalated)
            | (InProgress, Resolved)
            | (InProgress, Closed)
            | (Resolved, Closed)
            | (Escalated, Resolved)
            | (Escalated, Open)
    )
}

/// Pure read of a ticket's SLA health at `now`. Terminal tickets report
/// Resolved at 100% and never breach retroactively. The percentage is a
/// non-decreasing function of `now` for non-terminal tickets.
pub fn sla_status(ticket: &Ticket, now: DateTime<Utc>) -> SlaReport {
    if ticket.status.is_terminal() {
        return SlaReport {
            health: SlaHealth::Resolved,
            percentage: 100.0,
        };
    }

    // Computed in whole seconds so the 80% and 100% band edges land exactly
    let threshold_secs = ticket.priority.sla_hours() * 3600;
    let elapsed_secs = (now - ticket.created_at).num_seconds();
    let percentage = (elapsed_secs as f64 / threshold_secs as f64 * 100.0).min(100.0);

    let health = if percentage >= 100.0 {
        SlaHealth::Breached
    } else if percentage >= 80.0 {
        SlaHealth::AtRisk
    } else {
        SlaHealth::OnTime
    };

    SlaReport { health, percentage }
}

/// Role-based projection of the ticket collection. Access control, not
/// business logic.
pub fn visible_to(ticket: &Ticket, viewer: &Viewer) -> bool {
    match viewer.role {
        Role::DepartmentHead => true,
        Role::Consumer => {
            viewer.consumer_number.as_deref() == Some(ticket.consumer_number.as_str())
        }
        Role::SiteEngineer => {
            let zone_match = viewer.zone.as_deref() == Some(ticket.zone.as_str());
            let assigned_match = match (&ticket.assigned_to, &viewer.name) {
                (Some(assigned), Some(name)) => assigned == name,
                _ => false,
            };
            zone_match || assigned_match
        }
    }
}

pub struct Engine<'a> {
    db: &'a Database,
}

impl<'a> Engine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Engine { db }
    }

    pub fn create_ticket(&self, new: NewTicket, now: DateTime<Utc>) -> Result<Ticket> {
        for (value, field) in [
            (&new.customer_name, "Customer name"),
            (&new.consumer_number, "Consumer number"),
            (&new.title, "Title"),
            (&new.description, "Description"),
        ] {
            if value.trim().is_empty() {
                return Err(EngineError::Validation(format!("{} is required", field)).into());
            }
        }

        self.db.with_tx(|db| {
            let ticket = db.insert_ticket(&new, now)?;
            db.insert_notification(
                NotificationKind::TicketCreated,
                &format!(
                    "New ticket {} from {} ({})",
                    ticket.ticket_number, ticket.customer_name, ticket.zone
                ),
                ticket.id,
                &ticket.ticket_number,
                &[Role::SiteEngineer, Role::DepartmentHead],
                now,
            )?;
            Ok(ticket)
        })
    }

    /// Manual status change. Rejects anything outside the transition table
    /// and leaves the ticket untouched on rejection.
    pub fn update_status(
        &self,
        id: i64,
        to: TicketStatus,
        remarks: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let ticket = self
            .db
            .get_ticket(id)?
            .ok_or(EngineError::NotFound(id))?;

        if !transition_allowed(ticket.status, to) {
            return Err(EngineError::InvalidTransition {
                from: ticket.status,
                to,
            }
            .into());
        }

        self.db.with_tx(|db| {
            db.set_status(id, to, remarks, now)?;

            match to {
                TicketStatus::Resolved => {
                    db.insert_notification(
                        NotificationKind::TicketResolved,
                        &format!("Ticket {} has been resolved", ticket.ticket_number),
                        ticket.id,
                        &ticket.ticket_number,
                        &[Role::Consumer],
                        now,
                    )?;
                }
                TicketStatus::Escalated => {
                    db.insert_notification(
                        NotificationKind::SlaEscalation,
                        &format!(
                            "Ticket {} has been escalated due to SLA breach",
                            ticket.ticket_number
                        ),
                        ticket.id,
                        &ticket.ticket_number,
                        &[Role::DepartmentHead],
                        now,
                    )?;
                }
                _ => {}
            }

            db.get_ticket(id)?
                .ok_or_else(|| EngineError::NotFound(id).into())
        })
    }

    /// One pass of the escalation sweep: every Open or In Progress ticket
    /// whose SLA is breached at `now` moves to Escalated, exactly once, with
    /// exactly one department-head notification. Returns the tickets
    /// escalated by this pass; an immediate re-run returns an empty list.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<Ticket>> {
        let mut escalated = Vec::new();

        for ticket in self.db.list_active_tickets()? {
            if sla_status(&ticket, now).health != SlaHealth::Breached {
                continue;
            }

            // Decide-and-write is one atomic step per ticket; the conditional
            // UPDATE inside makes a lost race a no-op instead of a duplicate
            let did_escalate = self.db.with_tx(|db| {
                if !db.mark_escalated(ticket.id, now)? {
                    return Ok(false);
                }
                db.insert_notification(
                    NotificationKind::SlaEscalation,
                    &format!(
                        "Ticket {} has been escalated due to SLA breach",
                        ticket.ticket_number
                    ),
                    ticket.id,
                    &ticket.ticket_number,
                    &[Role::DepartmentHead],
                    now,
                )?;
                Ok(true)
            })?;

            if did_escalate {
                if let Some(t) = self.db.get_ticket(ticket.id)? {
                    escalated.push(t);
                }
            }
        }

        Ok(escalated)
    }

    /// Attach the one allowed feedback record to a resolved ticket. A rating
    /// of 2 or below raises a low-rating alert for the department head.
    pub fn attach_feedback(
        &self,
        id: i64,
        rating: u8,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !(1..=5).contains(&rating) {
            return Err(
                EngineError::Validation("Rating must be between 1 and 5".to_string()).into(),
            );
        }

        let ticket = self
            .db
            .get_ticket(id)?
            .ok_or(EngineError::NotFound(id))?;

        if ticket.status != TicketStatus::Resolved {
            return Err(EngineError::Validation(format!(
                "Feedback requires a resolved ticket (ticket {} is {})",
                ticket.ticket_number, ticket.status
            ))
            .into());
        }

        if self.db.get_feedback(id)?.is_some() {
            return Err(EngineError::Validation(format!(
                "Feedback already recorded for ticket {}",
                ticket.ticket_number
            ))
            .into());
        }

        self.db.with_tx(|db| {
            db.insert_feedback(id, rating, comment, now)?;
            if rating <= 2 {
                db.insert_notification(
                    NotificationKind::LowRating,
                    &format!(
                        "Ticket {} rated {}/5 by {}",
                        ticket.ticket_number, rating, ticket.customer_name
                    ),
                    ticket.id,
                    &ticket.ticket_number,
                    &[Role::DepartmentHead],
                    now,
                )?;
            }
            Ok(())
        })
    }

    pub fn assign(&self, id: i64, engineer: &str, now: DateTime<Utc>) -> Result<Ticket> {
        if engineer.trim().is_empty() {
            return Err(EngineError::Validation("Engineer name is required".to_string()).into());
        }
        if !self.db.assign_ticket(id, engineer, now)? {
            return Err(EngineError::NotFound(id).into());
        }
        self.db
            .get_ticket(id)?
            .ok_or_else(|| EngineError::NotFound(id).into())
    }

    pub fn list_for(&self, viewer: &Viewer) -> Result<Vec<Ticket>> {
        let mut tickets = self.db.list_tickets(None, None, None)?;
        tickets.retain(|t| visible_to(t, viewer));
        Ok(tickets)
    }

    pub fn notifications_for(&self, role: Role) -> Result<Vec<Notification>> {
        let mut notifications = self.db.list_notifications()?;
        notifications.retain(|n| n.target_roles.contains(&role));
        Ok(notifications)
    }

    pub fn mark_read(&self, id: i64) -> Result<()> {
        if !self.db.mark_notification_read(id)? {
            bail!("Notification #{} not found", id);
        }
        Ok(())
    }
}
