use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::db::Database;

pub fn run(path: &Path) -> Result<()> {
    let gridline_dir = path.join(".gridline");

    if gridline_dir.exists() {
        println!("gridline already initialized at {}", gridline_dir.display());
        return Ok(());
    }

    fs::create_dir_all(&gridline_dir).context("Failed to create .gridline directory")?;

    // Opening the database creates the schema
    let db_path = gridline_dir.join("tickets.db");
    Database::open(&db_path)?;

    println!("Initialized gridline in {}", gridline_dir.display());
    println!();
    println!("Next steps:");
    println!("  gridline submit \"<title>\" -d \"<description>\" --customer <name> \\");
    println!("      --consumer-number <number> -z <zone> -p high");
    println!("  gridline daemon start    # periodic SLA escalation sweep");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_dir_and_db() {
        let dir = tempdir().unwrap();

        run(dir.path()).unwrap();

        assert!(dir.path().join(".gridline").is_dir());
        assert!(dir.path().join(".gridline/tickets.db").exists());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let dir = tempdir().unwrap();

        run(dir.path()).unwrap();
        run(dir.path()).unwrap();

        assert!(dir.path().join(".gridline/tickets.db").exists());
    }
}
