use anyhow::Result;
use chrono::Utc;

use crate::db::Database;
use crate::engine::Engine;

pub fn run(db: &Database, id: i64, rating: u8, comment: Option<&str>) -> Result<()> {
    let engine = Engine::new(db);
    engine.attach_feedback(id, rating, comment, Utc::now())?;

    println!("Feedback recorded for ticket #{}: {}/5", id, rating);
    if rating <= 2 {
        println!("Low rating alert sent to the department head.");
    }
    Ok(())
}
