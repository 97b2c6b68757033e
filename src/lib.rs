//! gridline: a complaint desk with an SLA escalation engine.
//!
//! Tickets move through a fixed lifecycle (`open -> in-progress -> resolved
//! -> closed`, with an `escalated` side branch for SLA breaches). The
//! [`engine`] module owns the rules; [`db`] is the SQLite-backed store;
//! [`commands`] and the binary are the thin CLI on top.

pub mod commands;
pub mod daemon;
pub mod db;
pub mod engine;
pub mod models;
