//! Error types for the workdesk data-access layer.
//!
//! # Design
//! One enum per concern. `ApiError` covers everything that can go wrong
//! between building a backend request and normalizing its response;
//! `TimerError` is the time tracker's own taxonomy and never wraps backend
//! failures, since timer operations do no I/O.

use thiserror::Error;

use crate::types::RecordId;

/// Errors returned by the record client and the services built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend returned 404: the table or record does not exist.
    #[error("resource not found")]
    NotFound,

    /// A non-2xx status whose body was not a backend envelope.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The backend answered with `success: false`.
    #[error("{0}")]
    Backend(String),

    /// The request succeeded but the backend rejected a record in it.
    #[error("{0}")]
    RecordRejected(String),

    /// Input failed local validation before any request was built.
    #[error("{0}")]
    InvalidInput(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Errors returned by timer transitions.
///
/// A failed transition never mutates tracker state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// `start_timer` while a session is already running.
    #[error("Timer already running for this task")]
    Conflict { task_id: RecordId },

    /// `stop_timer` while no session is running.
    #[error("No active timer for this task")]
    NotFound { task_id: RecordId },
}

/// Errors returned when loading seed data into the tracker.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("malformed seed data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("time log {log_id} of task {task_id} ends before it starts")]
    NegativeDuration { task_id: RecordId, log_id: u64 },

    #[error("task {task_id} holds an active timer for task {timer_task_id}")]
    ForeignTimer {
        task_id: RecordId,
        timer_task_id: RecordId,
    },

    #[error("total tracked time of task {task_id} overflows")]
    TotalOverflow { task_id: RecordId },

    #[error("time log id {log_id} leaves no room for further ids")]
    LogIdExhausted { log_id: u64 },
}

/// Errors returned when reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
}
