use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

/// A stored row: column name to value, always including a numeric `Id`.
pub type Record = Map<String, Value>;

/// Tables served by the backend and the columns each one requires.
pub const TABLES: &[(&str, &[&str])] = &[
    ("task", &["Name"]),
    ("client", &["Name", "email"]),
    ("app_invoice", &["Name", "projectId"]),
];

#[derive(Debug, Default)]
pub struct Table {
    next_id: u64,
    rows: BTreeMap<u64, Record>,
    required: &'static [&'static str],
}

impl Table {
    fn new(required: &'static [&'static str]) -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
            required,
        }
    }

    fn validate(&self, record: &Record) -> Vec<FieldError> {
        self.required
            .iter()
            .filter(|field| is_blank(record.get(**field)))
            .map(|field| FieldError {
                field_label: field.to_string(),
                message: "Field is required".to_string(),
            })
            .collect()
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

#[derive(Debug)]
pub struct Store {
    tables: HashMap<String, Table>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            tables: TABLES
                .iter()
                .map(|&(name, required)| (name.to_string(), Table::new(required)))
                .collect(),
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<RecordOutcome>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RecordOutcome {
    fn stored(record: &Record) -> Self {
        Self {
            success: true,
            data: Some(Value::Object(record.clone())),
            errors: None,
            message: None,
        }
    }

    fn invalid(errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            data: None,
            errors: Some(errors),
            message: None,
        }
    }

    fn failed(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            errors: None,
            message: Some(message.to_string()),
        }
    }

    fn deleted() -> Self {
        Self {
            success: true,
            data: None,
            errors: None,
            message: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(rename = "fieldLabel")]
    pub field_label: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct FetchParams {
    #[serde(default)]
    pub fields: Vec<FieldRef>,
    #[serde(default, rename = "orderBy")]
    pub order_by: Vec<OrderBy>,
}

#[derive(Deserialize)]
pub struct FieldRef {
    pub field: FieldName,
}

#[derive(Deserialize)]
pub struct FieldName {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Deserialize)]
pub struct OrderBy {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(default, rename = "sorttype")]
    pub sort_type: SortType,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortType {
    #[default]
    Asc,
    Desc,
}

#[derive(Deserialize)]
pub struct RecordsPayload {
    pub records: Vec<Record>,
}

#[derive(Deserialize)]
pub struct GetQuery {
    pub fields: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub ids: String,
}

type Reply = (StatusCode, Json<Envelope>);

fn reply_error(status: StatusCode, message: String) -> Reply {
    (
        status,
        Json(Envelope {
            success: false,
            message: Some(message),
            ..Envelope::default()
        }),
    )
}

fn reply_data(data: Value) -> Reply {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            data: Some(data),
            ..Envelope::default()
        }),
    )
}

fn reply_results(results: Vec<RecordOutcome>) -> Reply {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            results: Some(results),
            ..Envelope::default()
        }),
    )
}

fn unknown_table(table: &str) -> Reply {
    reply_error(StatusCode::NOT_FOUND, format!("Table '{table}' not found"))
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route(
            "/tables/{table}/records",
            post(create_records).put(update_records).delete(delete_records),
        )
        .route("/tables/{table}/records/query", post(fetch_records))
        .route("/tables/{table}/records/{id}", get(get_record))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Keep `Id` plus the requested columns; missing columns come back as null.
/// An empty field list keeps every column.
pub fn project(record: &Record, fields: &[&str]) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    let mut projected = Record::new();
    if let Some(id) = record.get("Id") {
        projected.insert("Id".to_string(), id.clone());
    }
    for field in fields {
        let value = record.get(*field).cloned().unwrap_or(Value::Null);
        projected.insert(field.to_string(), value);
    }
    projected
}

/// Total order over column values: null, then booleans, numbers, strings,
/// and anything else.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Apply orderings as a stable multi-key sort, first entry most significant.
pub fn sort_records(rows: &mut [&Record], order_by: &[OrderBy]) {
    for order in order_by.iter().rev() {
        rows.sort_by(|a, b| {
            let ordering = compare_values(a.get(&order.field_name), b.get(&order.field_name));
            match order.sort_type {
                SortType::Asc => ordering,
                SortType::Desc => ordering.reverse(),
            }
        });
    }
}

async fn fetch_records(
    State(db): State<Db>,
    Path(table): Path<String>,
    Json(params): Json<FetchParams>,
) -> Reply {
    let store = db.read().await;
    let Some(rows) = store.tables.get(&table).map(|t| &t.rows) else {
        return unknown_table(&table);
    };
    let fields: Vec<&str> = params.fields.iter().map(|f| f.field.name.as_str()).collect();
    let mut matched: Vec<&Record> = rows.values().collect();
    sort_records(&mut matched, &params.order_by);
    let data = matched
        .into_iter()
        .map(|record| Value::Object(project(record, &fields)))
        .collect();
    reply_data(Value::Array(data))
}

async fn get_record(
    State(db): State<Db>,
    Path((table, id)): Path<(String, u64)>,
    Query(query): Query<GetQuery>,
) -> Reply {
    let store = db.read().await;
    let Some(t) = store.tables.get(&table) else {
        return unknown_table(&table);
    };
    let Some(record) = t.rows.get(&id) else {
        return reply_error(StatusCode::NOT_FOUND, "Record not found".to_string());
    };
    let fields: Vec<&str> = query
        .fields
        .as_deref()
        .map(|f| f.split(',').filter(|name| !name.is_empty()).collect())
        .unwrap_or_default();
    reply_data(Value::Object(project(record, &fields)))
}

async fn create_records(
    State(db): State<Db>,
    Path(table): Path<String>,
    Json(payload): Json<RecordsPayload>,
) -> Reply {
    let mut store = db.write().await;
    let Some(t) = store.tables.get_mut(&table) else {
        return unknown_table(&table);
    };
    let results = payload
        .records
        .into_iter()
        .map(|mut record| {
            record.remove("Id");
            let errors = t.validate(&record);
            if !errors.is_empty() {
                return RecordOutcome::invalid(errors);
            }
            let id = t.next_id;
            t.next_id += 1;
            record.insert("Id".to_string(), Value::from(id));
            let outcome = RecordOutcome::stored(&record);
            t.rows.insert(id, record);
            outcome
        })
        .collect::<Vec<_>>();
    debug!(table = %table, submitted = results.len(), "create");
    reply_results(results)
}

async fn update_records(
    State(db): State<Db>,
    Path(table): Path<String>,
    Json(payload): Json<RecordsPayload>,
) -> Reply {
    let mut store = db.write().await;
    let Some(t) = store.tables.get_mut(&table) else {
        return unknown_table(&table);
    };
    let results = payload
        .records
        .into_iter()
        .map(|changes| {
            let Some(id) = changes.get("Id").and_then(Value::as_u64) else {
                return RecordOutcome::failed("Record Id is required");
            };
            let Some(existing) = t.rows.get(&id) else {
                return RecordOutcome::failed("Record not found");
            };
            let mut merged = existing.clone();
            merged.extend(changes);
            let errors = t.validate(&merged);
            if !errors.is_empty() {
                return RecordOutcome::invalid(errors);
            }
            let outcome = RecordOutcome::stored(&merged);
            t.rows.insert(id, merged);
            outcome
        })
        .collect::<Vec<_>>();
    debug!(table = %table, submitted = results.len(), "update");
    reply_results(results)
}

async fn delete_records(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Reply {
    let ids: Result<Vec<u64>, _> = query
        .ids
        .split(',')
        .filter(|id| !id.is_empty())
        .map(str::parse)
        .collect();
    let Ok(ids) = ids else {
        return reply_error(StatusCode::BAD_REQUEST, format!("Invalid record ids '{}'", query.ids));
    };

    let mut store = db.write().await;
    let Some(t) = store.tables.get_mut(&table) else {
        return unknown_table(&table);
    };
    let results = ids
        .into_iter()
        .map(|id| match t.rows.remove(&id) {
            Some(_) => RecordOutcome::deleted(),
            None => RecordOutcome::failed("Record not found"),
        })
        .collect::<Vec<_>>();
    debug!(table = %table, submitted = results.len(), "delete");
    reply_results(results)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn envelope_omits_absent_parts() {
        let (_, Json(envelope)) = reply_data(json!([]));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json, json!({"success": true, "data": []}));
    }

    #[test]
    fn outcome_serializes_field_errors() {
        let outcome = RecordOutcome::invalid(vec![FieldError {
            field_label: "Name".to_string(),
            message: "Field is required".to_string(),
        }]);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            json!({"success": false, "errors": [{"fieldLabel": "Name", "message": "Field is required"}]})
        );
    }

    #[test]
    fn validate_flags_missing_null_and_blank() {
        let table = Table::new(&["Name", "email"]);
        assert!(table.validate(&record(json!({"Name": "A", "email": "a@b"}))).is_empty());

        let errors = table.validate(&record(json!({"Name": "  ", "email": null})));
        let labels: Vec<_> = errors.iter().map(|e| e.field_label.as_str()).collect();
        assert_eq!(labels, ["Name", "email"]);

        assert_eq!(table.validate(&record(json!({"email": "a@b"}))).len(), 1);
    }

    #[test]
    fn project_keeps_id_and_nulls_missing() {
        let row = record(json!({"Id": 1, "Name": "A", "title": "T", "secret": 1}));
        let projected = project(&row, &["Name", "dueDate"]);
        assert_eq!(Value::Object(projected), json!({"Id": 1, "Name": "A", "dueDate": null}));
        assert_eq!(project(&row, &[]), row);
    }

    #[test]
    fn sort_records_multi_key() {
        let a = record(json!({"Id": 1, "status": "open", "dueDate": "2024-03-01"}));
        let b = record(json!({"Id": 2, "status": "done", "dueDate": "2024-01-01"}));
        let c = record(json!({"Id": 3, "status": "open", "dueDate": null}));
        let mut rows = vec![&a, &b, &c];
        let order = vec![
            OrderBy {
                field_name: "status".to_string(),
                sort_type: SortType::Desc,
            },
            OrderBy {
                field_name: "dueDate".to_string(),
                sort_type: SortType::Asc,
            },
        ];
        sort_records(&mut rows, &order);
        let ids: Vec<_> = rows.iter().map(|r| r["Id"].as_u64().unwrap()).collect();
        assert_eq!(ids, [3, 1, 2]);
    }

    #[test]
    fn compare_values_orders_numbers_numerically() {
        assert_eq!(compare_values(Some(&json!(9)), Some(&json!(10.5))), Ordering::Less);
        assert_eq!(compare_values(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
    }

    #[test]
    fn fetch_params_default_sort_is_ascending() {
        let params: FetchParams =
            serde_json::from_str(r#"{"fields":[],"orderBy":[{"fieldName":"Name"}]}"#).unwrap();
        assert_eq!(params.order_by[0].sort_type, SortType::Asc);
    }
}
