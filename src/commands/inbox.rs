use anyhow::{bail, Result};
use std::str::FromStr;

use crate::db::Database;
use crate::engine::Engine;
use crate::models::Role;

pub fn list(db: &Database, role: &str) -> Result<()> {
    let role = match Role::from_str(role) {
        Ok(r) => r,
        Err(e) => bail!("{}", e),
    };

    let engine = Engine::new(db);
    let notifications = engine.notifications_for(role)?;

    if notifications.is_empty() {
        println!("Inbox empty for {}.", role);
        return Ok(());
    }

    for n in &notifications {
        let marker = if n.unread { "*" } else { " " };
        println!(
            "{} #{:<4} [{}] {} ({})",
            marker,
            n.id,
            n.kind,
            n.message,
            n.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    let unread = notifications.iter().filter(|n| n.unread).count();
    println!();
    println!("{} notification(s), {} unread", notifications.len(), unread);

    Ok(())
}

pub fn read(db: &Database, id: i64) -> Result<()> {
    let engine = Engine::new(db);
    engine.mark_read(id)?;
    println!("Marked notification #{} as read", id);
    Ok(())
}
