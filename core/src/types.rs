//! Domain DTOs for the record backend's `task`, `client` and `app_invoice`
//! tables.
//!
//! # Design
//! Records mirror the backend's column names (`Id`, `Name`, camelCase for the
//! rest). Every column except `Id` is optional on read because the backend
//! returns only the projected fields and may hold nulls.

use serde::{Deserialize, Serialize};

/// Backend record identifier. Positive for every stored record.
pub type RecordId = u64;

/// A task record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "Id")]
    pub id: RecordId,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    pub project_id: Option<RecordId>,
    pub title: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<String>,
    pub total_time: Option<u64>,
}

/// Caller-supplied fields for creating or replacing a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    /// Display name; defaults to `title` when absent.
    #[serde(default)]
    pub name: Option<String>,
    pub project_id: RecordId,
    pub title: String,
    pub priority: String,
    pub status: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub total_time: Option<u64>,
}

/// A client record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(rename = "Id")]
    pub id: RecordId,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// An invoice record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(rename = "Id")]
    pub id: RecordId,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    pub client_id: Option<RecordId>,
    pub project_id: Option<RecordId>,
    pub amount: Option<f64>,
    pub status: Option<String>,
    pub due_date: Option<String>,
    pub payment_date: Option<String>,
}

/// Invoice fields for create and partial update. Omitted fields are left
/// untouched on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceInput {
    #[serde(default)]
    pub client_id: Option<RecordId>,
    #[serde(default)]
    pub project_id: Option<RecordId>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub payment_date: Option<String>,
}
