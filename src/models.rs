use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
    Escalated,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
            TicketStatus::Escalated => "escalated",
        }
    }

    /// Resolved and Closed tickets never change SLA state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            "escalated" => Ok(TicketStatus::Escalated),
            _ => Err(format!(
                "Invalid status '{}'. Must be one of: open, in-progress, resolved, closed, escalated",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// SLA window in hours before a ticket of this priority breaches.
    pub fn sla_hours(&self) -> i64 {
        match self {
            Priority::High => 24,
            Priority::Medium => 72,
            Priority::Low => 168,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(format!(
                "Invalid priority '{}'. Must be one of: low, medium, high",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Complaint,
    Maintenance,
    EnergyTheft,
    GeneralQuery,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Complaint => "complaint",
            Category::Maintenance => "maintenance",
            Category::EnergyTheft => "energy_theft",
            Category::GeneralQuery => "general_query",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "complaint" => Ok(Category::Complaint),
            "maintenance" => Ok(Category::Maintenance),
            "energy_theft" => Ok(Category::EnergyTheft),
            "general_query" => Ok(Category::GeneralQuery),
            _ => Err(format!(
                "Invalid category '{}'. Must be one of: complaint, maintenance, energy-theft, general-query",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Consumer,
    SiteEngineer,
    DepartmentHead,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Consumer => "consumer",
            Role::SiteEngineer => "site_engineer",
            Role::DepartmentHead => "department_head",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "consumer" => Ok(Role::Consumer),
            "site_engineer" => Ok(Role::SiteEngineer),
            "department_head" => Ok(Role::DepartmentHead),
            _ => Err(format!(
                "Invalid role '{}'. Must be one of: consumer, site-engineer, department-head",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TicketCreated,
    SlaEscalation,
    TicketResolved,
    LowRating,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TicketCreated => "ticket_created",
            NotificationKind::SlaEscalation => "sla_escalation",
            NotificationKind::TicketResolved => "ticket_resolved",
            NotificationKind::LowRating => "low_rating",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ticket_created" => Ok(NotificationKind::TicketCreated),
            "sla_escalation" => Ok(NotificationKind::SlaEscalation),
            "ticket_resolved" => Ok(NotificationKind::TicketResolved),
            "low_rating" => Ok(NotificationKind::LowRating),
            _ => Err(format!("Invalid notification kind '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub status: TicketStatus,
    pub customer_name: String,
    pub consumer_number: String,
    pub zone: String,
    pub assigned_to: Option<String>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub escalated_at: Option<DateTime<Utc>>,
    pub escalated_to: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Fields supplied by the customer-facing submission form.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub customer_name: String,
    pub consumer_number: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub zone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub ticket_id: i64,
    pub ticket_number: String,
    pub target_roles: Vec<Role>,
    pub unread: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub ticket_id: i64,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Who is asking. Consumers see their own tickets, site engineers their
/// zone (or anything assigned to them by name), department heads everything.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub role: Role,
    pub name: Option<String>,
    pub consumer_number: Option<String>,
    pub zone: Option<String>,
}

impl Viewer {
    pub fn department_head() -> Self {
        Viewer {
            role: Role::DepartmentHead,
            name: None,
            consumer_number: None,
            zone: None,
        }
    }
}
