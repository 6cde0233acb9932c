//! Data-access core for the workdesk business app: clients, invoices, tasks.
//!
//! # Overview
//! Persistence, querying and validation happen in a hosted record backend.
//! This crate builds the backend's `HttpRequest` values and parses its
//! `HttpResponse` envelopes without touching the network (host-does-IO
//! pattern); the caller executes the round trip.
//!
//! The one piece of local state is the [`TimeTracker`]: start/stop timers
//! and completed time logs per task, which the backend schema has no room
//! for. [`TaskService`] keeps it in step with the task table.
//!
//! # Design
//! - `RecordClient` knows routes and envelopes; the services in
//!   [`services`] know tables, fields and record shapes.
//! - The tracker is an explicit component shared as `Arc<TimeTracker>`;
//!   it is `Send + Sync` and takes an injectable [`Clock`].
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod services;
pub mod tracker;
pub mod types;

pub use client::RecordClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::BackendConfig;
pub use envelope::{FetchParams, SortType};
pub use error::{ApiError, ConfigError, SeedError, TimerError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use services::{ClientService, InvoiceService, TaskService, TrackedTask};
pub use tracker::{ActiveTimer, TimeLog, TimeTracker, TimeTrackingState};
pub use types::{Client, ClientInput, Invoice, InvoiceInput, RecordId, Task, TaskInput};
