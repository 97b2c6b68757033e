use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

use gridline::commands;
use gridline::daemon;
use gridline::db::Database;

#[derive(Parser)]
#[command(name = "gridline")]
#[command(about = "A lean complaint desk CLI for electricity-utility service centers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize gridline in the current directory
    Init,

    /// Submit a new ticket
    Submit {
        /// Ticket title
        title: String,
        /// What happened
        #[arg(short, long)]
        description: String,
        /// Customer name
        #[arg(long)]
        customer: String,
        /// Consumer account number
        #[arg(long)]
        consumer_number: String,
        /// Geographic zone handling the ticket
        #[arg(short, long)]
        zone: String,
        /// Category (complaint, maintenance, energy-theft, general-query)
        #[arg(short, long, default_value = "complaint")]
        category: String,
        /// Priority (low, medium, high)
        #[arg(short, long, default_value = "medium")]
        priority: String,
    },

    /// List tickets visible to a role
    List {
        /// Filter by status (open, in-progress, resolved, closed, escalated, all)
        #[arg(short, long, default_value = "all")]
        status: String,
        /// Filter by priority
        #[arg(short, long)]
        priority: Option<String>,
        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,
        /// Viewing role (consumer, site-engineer, department-head)
        #[arg(long, default_value = "department_head")]
        role: String,
        /// Consumer account number (for --role consumer)
        #[arg(long)]
        consumer_number: Option<String>,
        /// Zone (for --role site-engineer)
        #[arg(long)]
        zone: Option<String>,
        /// Engineer name (for --role site-engineer assignment matches)
        #[arg(long)]
        name: Option<String>,
    },

    /// Show ticket details
    Show {
        /// Ticket ID
        id: i64,
    },

    /// Change a ticket's status
    Status {
        /// Ticket ID
        id: i64,
        /// New status (in-progress, resolved, closed, escalated, open)
        status: String,
        /// Remarks recorded with the change
        #[arg(short, long)]
        remarks: Option<String>,
    },

    /// Approve an escalated ticket (department head): escalated -> resolved
    Approve {
        /// Ticket ID
        id: i64,
        /// Remarks recorded with the approval
        #[arg(short, long)]
        remarks: Option<String>,
    },

    /// Reject an escalated ticket (department head): escalated -> open
    Reject {
        /// Ticket ID
        id: i64,
        /// Remarks recorded with the rejection
        #[arg(short, long)]
        remarks: Option<String>,
    },

    /// Assign a ticket to a site engineer
    Assign {
        /// Ticket ID
        id: i64,
        /// Engineer name
        engineer: String,
    },

    /// Attach feedback to a resolved ticket
    Feedback {
        /// Ticket ID
        id: i64,
        /// Rating, 1-5
        rating: u8,
        /// Free-text comment
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// SLA report across open tickets
    Sla,

    /// Run one escalation sweep pass now
    Sweep,

    /// Notification inbox
    Inbox {
        #[command(subcommand)]
        action: InboxCommands,
    },

    /// Export tickets and notifications as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Escalation daemon management
    Daemon {
        #[command(subcommand)]
        action: DaemonCommands,
    },
}

#[derive(Subcommand)]
enum InboxCommands {
    /// List notifications for a role
    List {
        /// Role (consumer, site-engineer, department-head)
        #[arg(long, default_value = "department_head")]
        role: String,
    },
    /// Mark a notification as read
    Read {
        /// Notification ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum DaemonCommands {
    /// Start the background escalation daemon
    Start {
        /// Seconds between sweep passes
        #[arg(long, default_value_t = daemon::DEFAULT_PERIOD_SECS)]
        period_secs: u64,
    },
    /// Stop the background escalation daemon
    Stop,
    /// Check daemon status
    Status,
    /// Internal: run the daemon loop (used by start)
    #[command(hide = true)]
    Run {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, default_value_t = daemon::DEFAULT_PERIOD_SECS)]
        period_secs: u64,
    },
}

fn find_gridline_dir() -> Result<PathBuf> {
    let mut current = env::current_dir()?;

    loop {
        let candidate = current.join(".gridline");
        if candidate.exists() && candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            bail!("Not a gridline directory (or any parent). Run 'gridline init' first.");
        }
    }
}

fn get_db() -> Result<Database> {
    let gridline_dir = find_gridline_dir()?;
    let db_path = gridline_dir.join("tickets.db");
    Database::open(&db_path).context("Failed to open database")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let cwd = env::current_dir()?;
            commands::init::run(&cwd)
        }

        Commands::Submit {
            title,
            description,
            customer,
            consumer_number,
            zone,
            category,
            priority,
        } => {
            let db = get_db()?;
            commands::submit::run(
                &db,
                &customer,
                &consumer_number,
                &title,
                &description,
                &category,
                &priority,
                &zone,
            )
        }

        Commands::List {
            status,
            priority,
            category,
            role,
            consumer_number,
            zone,
            name,
        } => {
            let db = get_db()?;
            commands::list::run(
                &db,
                &status,
                priority.as_deref(),
                category.as_deref(),
                &role,
                consumer_number,
                zone,
                name,
            )
        }

        Commands::Show { id } => {
            let db = get_db()?;
            commands::show::run(&db, id)
        }

        Commands::Status {
            id,
            status,
            remarks,
        } => {
            let db = get_db()?;
            commands::status::run(&db, id, &status, remarks.as_deref())
        }

        Commands::Approve { id, remarks } => {
            let db = get_db()?;
            commands::status::approve(&db, id, remarks.as_deref())
        }

        Commands::Reject { id, remarks } => {
            let db = get_db()?;
            commands::status::reject(&db, id, remarks.as_deref())
        }

        Commands::Assign { id, engineer } => {
            let db = get_db()?;
            commands::assign::run(&db, id, &engineer)
        }

        Commands::Feedback {
            id,
            rating,
            comment,
        } => {
            let db = get_db()?;
            commands::feedback::run(&db, id, rating, comment.as_deref())
        }

        Commands::Sla => {
            let db = get_db()?;
            commands::sla::run(&db)
        }

        Commands::Sweep => {
            let db = get_db()?;
            commands::sweep::run(&db)
        }

        Commands::Inbox { action } => {
            let db = get_db()?;
            match action {
                InboxCommands::List { role } => commands::inbox::list(&db, &role),
                InboxCommands::Read { id } => commands::inbox::read(&db, id),
            }
        }

        Commands::Export { output } => {
            let db = get_db()?;
            commands::export::run(&db, output.as_deref())
        }

        Commands::Daemon { action } => match action {
            DaemonCommands::Start { period_secs } => {
                let gridline_dir = find_gridline_dir()?;
                daemon::start(&gridline_dir, period_secs)
            }
            DaemonCommands::Stop => {
                let gridline_dir = find_gridline_dir()?;
                daemon::stop(&gridline_dir)
            }
            DaemonCommands::Status => {
                let gridline_dir = find_gridline_dir()?;
                daemon::status(&gridline_dir)
            }
            DaemonCommands::Run { dir, period_secs } => daemon::run_daemon(&dir, period_secs),
        },
    }
}
