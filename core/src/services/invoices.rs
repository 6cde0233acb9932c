//! Invoice records.
//!
//! Unlike tasks and clients, invoice input is checked locally before any
//! request is built: a create needs a project, a positive amount and a due
//! date, and an update may not set a non-positive amount.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::client::RecordClient;
use crate::clock::Clock;
use crate::envelope::{FetchParams, SortType};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::services::iso_timestamp;
use crate::types::{Invoice, InvoiceInput, RecordId};

pub const INVOICE_TABLE: &str = "app_invoice";

const INVOICE_FIELDS: &[&str] = &[
    "Name",
    "clientId",
    "projectId",
    "amount",
    "status",
    "dueDate",
    "paymentDate",
];

const DEFAULT_STATUS: &str = "draft";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewInvoiceRecord<'a> {
    #[serde(rename = "Name")]
    name: String,
    client_id: Option<RecordId>,
    project_id: RecordId,
    amount: f64,
    status: &'a str,
    due_date: &'a str,
    payment_date: Option<&'a str>,
}

/// Partial update: absent fields are not sent.
#[derive(Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvoicePatch<'a> {
    #[serde(rename = "Id")]
    id: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_date: Option<String>,
}

fn is_positive(amount: f64) -> bool {
    amount > 0.0
}

#[derive(Debug, Clone)]
pub struct InvoiceService {
    client: RecordClient,
    clock: Arc<dyn Clock>,
}

impl InvoiceService {
    pub fn new(client: RecordClient, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }

    /// All invoices, latest due date first.
    pub fn build_list_invoices(&self) -> Result<HttpRequest, ApiError> {
        let params = FetchParams::with_fields(INVOICE_FIELDS).order_by("dueDate", SortType::Desc);
        self.client.build_fetch_records(INVOICE_TABLE, &params)
    }

    pub fn parse_list_invoices(&self, response: HttpResponse) -> Result<Vec<Invoice>, ApiError> {
        self.client
            .parse_fetch_records(response)
            .inspect_err(|e| error!(error = %e, "failed to fetch invoices"))
    }

    pub fn build_get_invoice(&self, id: RecordId) -> HttpRequest {
        self.client.build_get_record(INVOICE_TABLE, id, INVOICE_FIELDS)
    }

    pub fn parse_get_invoice(&self, id: RecordId, response: HttpResponse) -> Result<Invoice, ApiError> {
        self.client
            .parse_get_record(response)
            .inspect_err(|e| error!(invoice_id = id, error = %e, "failed to fetch invoice"))
    }

    /// Validate and build a create. The invoice is named after the current
    /// epoch milliseconds and starts as a draft unless a status is given.
    pub fn build_create_invoice(&self, input: &InvoiceInput) -> Result<HttpRequest, ApiError> {
        let project_id = input
            .project_id
            .ok_or_else(|| ApiError::InvalidInput("Project ID is required".to_string()))?;
        let amount = input
            .amount
            .filter(|amount| is_positive(*amount))
            .ok_or_else(|| ApiError::InvalidInput("Amount must be greater than 0".to_string()))?;
        let due_date = input
            .due_date
            .as_deref()
            .filter(|date| !date.is_empty())
            .ok_or_else(|| ApiError::InvalidInput("Due date is required".to_string()))?;

        let record = NewInvoiceRecord {
            name: format!("Invoice-{}", self.clock.now().timestamp_millis()),
            client_id: input.client_id,
            project_id,
            amount,
            status: input.status.as_deref().unwrap_or(DEFAULT_STATUS),
            due_date,
            payment_date: input.payment_date.as_deref(),
        };
        self.client.build_create_records(INVOICE_TABLE, &[record])
    }

    pub fn parse_create_invoice(&self, response: HttpResponse) -> Result<Option<Invoice>, ApiError> {
        self.client
            .parse_mutation(response)
            .inspect_err(|e| error!(error = %e, "failed to create invoice"))
    }

    pub fn build_update_invoice(&self, id: RecordId, input: &InvoiceInput) -> Result<HttpRequest, ApiError> {
        if input.amount.is_some_and(|amount| !is_positive(amount)) {
            return Err(ApiError::InvalidInput("Amount must be greater than 0".to_string()));
        }
        let patch = InvoicePatch {
            id,
            client_id: input.client_id,
            project_id: input.project_id,
            amount: input.amount,
            status: input.status.as_deref(),
            due_date: input.due_date.as_deref(),
            payment_date: input.payment_date.clone(),
        };
        self.client.build_update_records(INVOICE_TABLE, &[patch])
    }

    pub fn build_mark_invoice_sent(&self, id: RecordId) -> Result<HttpRequest, ApiError> {
        let patch = InvoicePatch {
            id,
            status: Some("sent"),
            ..InvoicePatch::default()
        };
        self.client.build_update_records(INVOICE_TABLE, &[patch])
    }

    pub fn build_mark_invoice_paid(&self, id: RecordId, payment_date: DateTime<Utc>) -> Result<HttpRequest, ApiError> {
        let patch = InvoicePatch {
            id,
            status: Some("paid"),
            payment_date: Some(iso_timestamp(payment_date)),
            ..InvoicePatch::default()
        };
        self.client.build_update_records(INVOICE_TABLE, &[patch])
    }

    /// Parses the response to updates and to the mark-sent/mark-paid shortcuts.
    pub fn parse_update_invoice(&self, response: HttpResponse) -> Result<Option<Invoice>, ApiError> {
        self.client
            .parse_mutation(response)
            .inspect_err(|e| error!(error = %e, "failed to update invoice"))
    }

    pub fn build_delete_invoice(&self, id: RecordId) -> HttpRequest {
        self.client.build_delete_records(INVOICE_TABLE, &[id])
    }

    pub fn parse_delete_invoice(&self, id: RecordId, response: HttpResponse) -> Result<(), ApiError> {
        self.client
            .parse_delete(response)
            .inspect_err(|e| error!(invoice_id = id, error = %e, "failed to delete invoice"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::{json, Value};

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::BackendConfig;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn service() -> InvoiceService {
        let client = RecordClient::new(&BackendConfig::new("http://localhost:3000", "p", "k"));
        InvoiceService::new(client, Arc::new(ManualClock::new(now())))
    }

    fn valid_input() -> InvoiceInput {
        InvoiceInput {
            client_id: Some(3),
            project_id: Some(8),
            amount: Some(1250.5),
            due_date: Some("2024-07-01".to_string()),
            ..InvoiceInput::default()
        }
    }

    fn body(req: &HttpRequest) -> Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    fn invalid_input_message(result: Result<HttpRequest, ApiError>) -> String {
        match result {
            Err(ApiError::InvalidInput(message)) => message,
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn service_debug_names_its_clock() {
        let printed = format!("{:?}", service().clone());
        assert!(printed.starts_with("InvoiceService"));
        assert!(printed.contains("ManualClock"));
    }

    #[test]
    fn list_orders_by_due_date_descending() {
        let req = service().build_list_invoices().unwrap();
        assert_eq!(req.path, "http://localhost:3000/tables/app_invoice/records/query");
        assert_eq!(body(&req)["orderBy"], json!([{"fieldName": "dueDate", "sorttype": "DESC"}]));
    }

    #[test]
    fn create_names_invoice_and_defaults_status() {
        let req = service().build_create_invoice(&valid_input()).unwrap();
        assert_eq!(
            body(&req),
            json!({"records": [{
                "Name": format!("Invoice-{}", now().timestamp_millis()),
                "clientId": 3,
                "projectId": 8,
                "amount": 1250.5,
                "status": "draft",
                "dueDate": "2024-07-01",
                "paymentDate": null
            }]})
        );
    }

    #[test]
    fn create_requires_project() {
        let input = InvoiceInput {
            project_id: None,
            ..valid_input()
        };
        assert_eq!(invalid_input_message(service().build_create_invoice(&input)), "Project ID is required");
    }

    #[test]
    fn create_requires_positive_amount() {
        for amount in [None, Some(0.0), Some(-5.0), Some(f64::NAN)] {
            let input = InvoiceInput {
                amount,
                ..valid_input()
            };
            assert_eq!(
                invalid_input_message(service().build_create_invoice(&input)),
                "Amount must be greater than 0"
            );
        }
    }

    #[test]
    fn create_requires_due_date() {
        for due_date in [None, Some(String::new())] {
            let input = InvoiceInput {
                due_date,
                ..valid_input()
            };
            assert_eq!(invalid_input_message(service().build_create_invoice(&input)), "Due date is required");
        }
    }

    #[test]
    fn update_sends_only_supplied_fields() {
        let input = InvoiceInput {
            status: Some("sent".to_string()),
            ..InvoiceInput::default()
        };
        let req = service().build_update_invoice(9, &input).unwrap();
        assert_eq!(body(&req), json!({"records": [{"Id": 9, "status": "sent"}]}));
    }

    #[test]
    fn update_rejects_non_positive_amount() {
        let input = InvoiceInput {
            amount: Some(0.0),
            ..InvoiceInput::default()
        };
        assert_eq!(
            invalid_input_message(service().build_update_invoice(9, &input)),
            "Amount must be greater than 0"
        );
    }

    #[test]
    fn mark_sent_and_paid() {
        let sent = service().build_mark_invoice_sent(9).unwrap();
        assert_eq!(body(&sent), json!({"records": [{"Id": 9, "status": "sent"}]}));

        let paid_on = Utc.with_ymd_and_hms(2024, 6, 20, 0, 0, 0).unwrap();
        let paid = service().build_mark_invoice_paid(9, paid_on).unwrap();
        assert_eq!(
            body(&paid),
            json!({"records": [{"Id": 9, "status": "paid", "paymentDate": "2024-06-20T00:00:00.000Z"}]})
        );
    }

    #[test]
    fn parse_list_invoices_reads_amounts() {
        let response = HttpResponse::new(
            200,
            r#"{"success":true,"data":[{"Id":1,"Name":"Invoice-1","amount":99.95,"paymentDate":null}]}"#,
        );
        let invoices = service().parse_list_invoices(response).unwrap();
        assert_eq!(invoices[0].amount, Some(99.95));
        assert_eq!(invoices[0].payment_date, None);
    }
}
