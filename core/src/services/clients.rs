//! Client records.

use std::sync::Arc;

use serde::Serialize;
use tracing::error;

use crate::client::RecordClient;
use crate::clock::Clock;
use crate::envelope::{FetchParams, SortType};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::services::iso_timestamp;
use crate::types::{Client, ClientInput, RecordId};

pub const CLIENT_TABLE: &str = "client";

const CLIENT_FIELDS: &[&str] = &["Name", "email", "company", "status", "createdAt", "notes"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientRecord<'a> {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    #[serde(rename = "Name")]
    name: &'a str,
    email: &'a str,
    company: Option<&'a str>,
    status: &'a str,
    notes: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
}

impl<'a> ClientRecord<'a> {
    fn from_input(id: Option<RecordId>, input: &'a ClientInput) -> Self {
        Self {
            id,
            name: &input.name,
            email: &input.email,
            company: input.company.as_deref(),
            status: &input.status,
            notes: input.notes.as_deref().unwrap_or(""),
            created_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientService {
    client: RecordClient,
    clock: Arc<dyn Clock>,
}

impl ClientService {
    pub fn new(client: RecordClient, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }

    /// All clients by name.
    pub fn build_list_clients(&self) -> Result<HttpRequest, ApiError> {
        let params = FetchParams::with_fields(CLIENT_FIELDS).order_by("Name", SortType::Asc);
        self.client.build_fetch_records(CLIENT_TABLE, &params)
    }

    pub fn parse_list_clients(&self, response: HttpResponse) -> Result<Vec<Client>, ApiError> {
        self.client
            .parse_fetch_records(response)
            .inspect_err(|e| error!(error = %e, "failed to fetch clients"))
    }

    pub fn build_get_client(&self, id: RecordId) -> HttpRequest {
        self.client.build_get_record(CLIENT_TABLE, id, CLIENT_FIELDS)
    }

    pub fn parse_get_client(&self, id: RecordId, response: HttpResponse) -> Result<Client, ApiError> {
        self.client
            .parse_get_record(response)
            .inspect_err(|e| error!(client_id = id, error = %e, "failed to fetch client"))
    }

    /// Stamps `createdAt` with the current time.
    pub fn build_create_client(&self, input: &ClientInput) -> Result<HttpRequest, ApiError> {
        let record = ClientRecord {
            created_at: Some(iso_timestamp(self.clock.now())),
            ..ClientRecord::from_input(None, input)
        };
        self.client.build_create_records(CLIENT_TABLE, &[record])
    }

    pub fn parse_create_client(&self, response: HttpResponse) -> Result<Option<Client>, ApiError> {
        self.client
            .parse_mutation(response)
            .inspect_err(|e| error!(error = %e, "failed to create client"))
    }

    pub fn build_update_client(&self, id: RecordId, input: &ClientInput) -> Result<HttpRequest, ApiError> {
        self.client
            .build_update_records(CLIENT_TABLE, &[ClientRecord::from_input(Some(id), input)])
    }

    pub fn parse_update_client(&self, response: HttpResponse) -> Result<Option<Client>, ApiError> {
        self.client
            .parse_mutation(response)
            .inspect_err(|e| error!(error = %e, "failed to update client"))
    }

    pub fn build_delete_client(&self, id: RecordId) -> HttpRequest {
        self.client.build_delete_records(CLIENT_TABLE, &[id])
    }

    pub fn parse_delete_client(&self, id: RecordId, response: HttpResponse) -> Result<(), ApiError> {
        self.client
            .parse_delete(response)
            .inspect_err(|e| error!(client_id = id, error = %e, "failed to delete client"))
    }
}
