//! Task records plus their in-memory time tracking.
//!
//! # Design
//! Task rows live in the backend; timer state lives in the shared
//! [`TimeTracker`]. The service keeps the two in step at three points: a
//! confirmed create initializes tracking for the new id, every read attaches
//! the current tracking state, and a confirmed delete discards it. Nothing
//! touches the tracker before the backend has answered successfully.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::client::RecordClient;
use crate::envelope::{FetchParams, SortType};
use crate::error::{ApiError, TimerError};
use crate::http::{HttpRequest, HttpResponse};
use crate::tracker::{ActiveTimer, TimeLog, TimeTracker, TimeTrackingState};
use crate::types::{RecordId, Task, TaskInput};

pub const TASK_TABLE: &str = "task";

const TASK_FIELDS: &[&str] = &[
    "Name",
    "projectId",
    "title",
    "priority",
    "status",
    "dueDate",
    "totalTime",
];

/// A task record with its tracking state under `timeTracking`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedTask {
    #[serde(flatten)]
    pub task: Task,
    pub time_tracking: TimeTrackingState,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord<'a> {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    #[serde(rename = "Name")]
    name: &'a str,
    project_id: RecordId,
    title: &'a str,
    priority: &'a str,
    status: &'a str,
    due_date: Option<&'a str>,
    total_time: u64,
}

impl<'a> TaskRecord<'a> {
    fn from_input(id: Option<RecordId>, input: &'a TaskInput) -> Self {
        Self {
            id,
            name: input.name.as_deref().unwrap_or(&input.title),
            project_id: input.project_id,
            title: &input.title,
            priority: &input.priority,
            status: &input.status,
            due_date: input.due_date.as_deref(),
            total_time: input.total_time.unwrap_or(0),
        }
    }
}

#[derive(Serialize)]
struct TaskStatusRecord<'a> {
    #[serde(rename = "Id")]
    id: RecordId,
    status: &'a str,
}

#[derive(Debug, Clone)]
pub struct TaskService {
    client: RecordClient,
    tracker: Arc<TimeTracker>,
}

impl TaskService {
    pub fn new(client: RecordClient, tracker: Arc<TimeTracker>) -> Self {
        Self { client, tracker }
    }

    pub fn tracker(&self) -> &Arc<TimeTracker> {
        &self.tracker
    }

    fn track(&self, task: Task) -> TrackedTask {
        let time_tracking = self.tracker.attach(task.id);
        TrackedTask { task, time_tracking }
    }

    /// All tasks, earliest due date first.
    pub fn build_list_tasks(&self) -> Result<HttpRequest, ApiError> {
        let params = FetchParams::with_fields(TASK_FIELDS).order_by("dueDate", SortType::Asc);
        self.client.build_fetch_records(TASK_TABLE, &params)
    }

    pub fn parse_list_tasks(&self, response: HttpResponse) -> Result<Vec<TrackedTask>, ApiError> {
        let tasks: Vec<Task> = self
            .client
            .parse_fetch_records(response)
            .inspect_err(|e| error!(error = %e, "failed to fetch tasks"))?;
        Ok(tasks.into_iter().map(|task| self.track(task)).collect())
    }

    pub fn build_get_task(&self, id: RecordId) -> HttpRequest {
        self.client.build_get_record(TASK_TABLE, id, TASK_FIELDS)
    }

    pub fn parse_get_task(&self, id: RecordId, response: HttpResponse) -> Result<TrackedTask, ApiError> {
        let task: Task = self
            .client
            .parse_get_record(response)
            .inspect_err(|e| error!(task_id = id, error = %e, "failed to fetch task"))?;
        Ok(self.track(task))
    }

    pub fn build_create_task(&self, input: &TaskInput) -> Result<HttpRequest, ApiError> {
        self.client
            .build_create_records(TASK_TABLE, &[TaskRecord::from_input(None, input)])
    }

    /// Parse the created task and start tracking it from zero.
    pub fn parse_create_task(&self, response: HttpResponse) -> Result<Option<Task>, ApiError> {
        let created: Option<Task> = self
            .client
            .parse_mutation(response)
            .inspect_err(|e| error!(error = %e, "failed to create task"))?;
        if let Some(task) = &created {
            self.tracker.initialize_state(task.id);
            debug!(task_id = task.id, "task created");
        }
        Ok(created)
    }

    pub fn build_update_task(&self, id: RecordId, input: &TaskInput) -> Result<HttpRequest, ApiError> {
        self.client
            .build_update_records(TASK_TABLE, &[TaskRecord::from_input(Some(id), input)])
    }

    pub fn build_update_task_status(&self, id: RecordId, status: &str) -> Result<HttpRequest, ApiError> {
        self.client
            .build_update_records(TASK_TABLE, &[TaskStatusRecord { id, status }])
    }

    /// Parses the response to both full and status-only updates.
    pub fn parse_update_task(&self, response: HttpResponse) -> Result<Option<Task>, ApiError> {
        self.client
            .parse_mutation(response)
            .inspect_err(|e| error!(error = %e, "failed to update task"))
    }

    pub fn build_delete_task(&self, id: RecordId) -> HttpRequest {
        self.client.build_delete_records(TASK_TABLE, &[id])
    }

    /// Parse the deletion of `id` and drop its tracking state once confirmed.
    pub fn parse_delete_task(&self, id: RecordId, response: HttpResponse) -> Result<(), ApiError> {
        self.client
            .parse_delete(response)
            .inspect_err(|e| error!(task_id = id, error = %e, "failed to delete task"))?;
        self.tracker.discard(id);
        Ok(())
    }

    pub fn start_timer(&self, task_id: RecordId) -> Result<ActiveTimer, TimerError> {
        self.tracker.start_timer(task_id)
    }

    pub fn stop_timer(&self, task_id: RecordId) -> Result<TimeLog, TimerError> {
        self.tracker.stop_timer(task_id)
    }

    pub fn time_logs(&self, task_id: RecordId) -> Vec<TimeLog> {
        self.tracker.time_logs(task_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::Value;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::BackendConfig;
    use crate::http::HttpMethod;

    fn service() -> (TaskService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()));
        let tracker = Arc::new(TimeTracker::with_clock(clock.clone()));
        let client = RecordClient::new(&BackendConfig::new("http://localhost:3000", "p", "k"));
        (TaskService::new(client, tracker), clock)
    }

    fn input() -> TaskInput {
        TaskInput {
            name: None,
            project_id: 2,
            title: "Draft proposal".to_string(),
            priority: "high".to_string(),
            status: "todo".to_string(),
            due_date: Some("2024-02-01".to_string()),
            total_time: None,
        }
    }

    fn body(req: &HttpRequest) -> Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn build_list_tasks_orders_by_due_date() {
        let (svc, _) = service();
        let req = svc.build_list_tasks().unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/tables/task/records/query");
        let body = body(&req);
        assert_eq!(body["fields"].as_array().unwrap().len(), TASK_FIELDS.len());
        assert_eq!(body["orderBy"], serde_json::json!([{"fieldName": "dueDate", "sorttype": "ASC"}]));
    }

    #[test]
    fn list_attaches_tracking_state() {
        let (svc, clock) = service();
        svc.start_timer(1).unwrap();
        clock.advance(Duration::milliseconds(750));
        svc.stop_timer(1).unwrap();

        let response = HttpResponse::new(
            200,
            r#"{"success":true,"data":[{"Id":1,"title":"Tracked"},{"Id":2,"title":"Fresh"}]}"#,
        );
        let tasks = svc.parse_list_tasks(response).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].time_tracking.total_time, 750);
        assert_eq!(tasks[1].time_tracking, TimeTrackingState::default());
    }

    #[test]
    fn tracked_task_serializes_flat_with_time_tracking() {
        let (svc, _) = service();
        let response = HttpResponse::new(200, r#"{"success":true,"data":{"Id":5,"Name":"Five"}}"#);
        let task = svc.parse_get_task(5, response).unwrap();
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["Id"], 5);
        assert_eq!(json["Name"], "Five");
        assert_eq!(json["timeTracking"]["totalTime"], 0);
        assert_eq!(json["timeTracking"]["timeLogs"], serde_json::json!([]));
    }

    #[test]
    fn create_defaults_name_and_total_time() {
        let (svc, _) = service();
        let req = svc.build_create_task(&input()).unwrap();
        let body = body(&req);
        let record = &body["records"][0];
        assert_eq!(record["Name"], "Draft proposal");
        assert_eq!(record["projectId"], 2);
        assert_eq!(record["totalTime"], 0);
        assert!(record.get("Id").is_none());
    }

    #[test]
    fn create_initializes_tracking_for_new_id() {
        let (svc, _) = service();
        svc.start_timer(10).unwrap();

        let response = HttpResponse::new(
            200,
            r#"{"success":true,"results":[{"success":true,"data":{"Id":10,"title":"Draft proposal"}}]}"#,
        );
        let created = svc.parse_create_task(response).unwrap().unwrap();
        assert_eq!(created.id, 10);
        assert_eq!(svc.tracker().attach(10), TimeTrackingState::default());
    }

    #[test]
    fn rejected_create_reports_field_error() {
        let (svc, _) = service();
        let response = HttpResponse::new(
            200,
            r#"{"success":true,"results":[{"success":false,"errors":[{"fieldLabel":"title","message":"Too long"}]}]}"#,
        );
        let err = svc.parse_create_task(response).unwrap_err();
        assert_eq!(err.to_string(), "title: Too long");
    }

    #[test]
    fn update_requests_carry_id() {
        let (svc, _) = service();
        let full = body(&svc.build_update_task(4, &input()).unwrap());
        assert_eq!(full["records"][0]["Id"], 4);
        assert_eq!(full["records"][0]["status"], "todo");

        let status = svc.build_update_task_status(4, "done").unwrap();
        assert_eq!(status.method, HttpMethod::Put);
        assert_eq!(body(&status), serde_json::json!({"records": [{"Id": 4, "status": "done"}]}));
    }

    #[test]
    fn delete_discards_tracking_only_on_success() {
        let (svc, clock) = service();
        svc.start_timer(3).unwrap();
        clock.advance(Duration::seconds(2));
        svc.stop_timer(3).unwrap();

        let failed = HttpResponse::new(200, r#"{"success":false,"message":"Locked"}"#);
        assert!(svc.parse_delete_task(3, failed).is_err());
        assert_eq!(svc.time_logs(3).len(), 1);

        let ok = HttpResponse::new(200, r#"{"success":true,"results":[{"success":true}]}"#);
        svc.parse_delete_task(3, ok).unwrap();
        assert_eq!(svc.tracker().attach(3), TimeTrackingState::default());
    }

    #[test]
    fn build_delete_task_targets_single_id() {
        let (svc, _) = service();
        let req = svc.build_delete_task(12);
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "http://localhost:3000/tables/task/records?ids=12");
    }
}
