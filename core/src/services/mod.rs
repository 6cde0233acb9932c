//! Per-table services layered on [`RecordClient`](crate::RecordClient).
//!
//! Each service owns the table name, the projected field list and the shape
//! of the records it writes. Requests and responses follow the same
//! `build_*` / `parse_*` split as the client.

pub mod clients;
pub mod invoices;
pub mod tasks;

pub use clients::ClientService;
pub use invoices::InvoiceService;
pub use tasks::{TaskService, TrackedTask};

use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamps sent to the backend: RFC 3339, millisecond precision, `Z`.
pub(crate) fn iso_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
