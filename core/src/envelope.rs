//! Wire shapes of the record backend: query parameters and response envelopes.
//!
//! # Design
//! The backend wraps every payload in `{success, message, ...}`. Reads carry
//! `data`; writes carry one `results` entry per submitted record, each with
//! its own success flag and field errors. These types are generic over the
//! record type so every service shares the same relay logic.

use serde::{Deserialize, Serialize};

use crate::types::RecordId;

/// Field projection and ordering for a record query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchParams {
    pub fields: Vec<FieldRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
}

impl FetchParams {
    pub fn with_fields(names: &[&str]) -> Self {
        Self {
            fields: names.iter().map(|name| FieldRef::new(name)).collect(),
            order_by: Vec::new(),
        }
    }

    pub fn order_by(mut self, field: &str, sort_type: SortType) -> Self {
        self.order_by.push(OrderBy {
            field_name: field.to_string(),
            sort_type,
        });
        self
    }
}

/// `{"field": {"Name": "title"}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub field: FieldName,
}

impl FieldRef {
    pub fn new(name: &str) -> Self {
        Self {
            field: FieldName {
                name: name.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldName {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "sorttype")]
    pub sort_type: SortType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortType {
    Asc,
    Desc,
}

/// Body of create and update requests.
#[derive(Debug, Clone, Serialize)]
pub struct RecordsPayload<'a, T> {
    pub records: &'a [T],
}

/// Response to a query or a single-record read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Response to a create, update or delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsEnvelope<T> {
    pub success: bool,
    pub message: Option<String>,
    pub results: Option<Vec<RecordResult<T>>>,
}

/// Outcome for one submitted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub errors: Option<Vec<FieldError>>,
    pub message: Option<String>,
}

impl<T> RecordResult<T> {
    /// Human-readable reason for a failed record: the first field error,
    /// else the record message.
    pub fn failure_reason(&self) -> Option<String> {
        if let Some(error) = self.errors.as_deref().and_then(<[FieldError]>::first) {
            return Some(format!("{}: {}", error.field_label, error.message));
        }
        self.message.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(rename = "fieldLabel")]
    pub field_label: String,
    pub message: String,
}

/// Minimal envelope probe used when a non-2xx body may still carry a message.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub message: Option<String>,
}

/// Render record ids as the backend's `ids=` query value.
pub(crate) fn join_ids(ids: &[RecordId]) -> String {
    ids.iter()
        .map(RecordId::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
