//! REST gateway for the task backend.

use crate::http::ApiClient;
use async_trait::async_trait;
use taskdesk_core::error::Result;
use taskdesk_core::pagination::{OperationResult, PageResponse};
use taskdesk_core::task::{Task, TaskGateway, TaskId, TaskPatch, TaskRequest};

const TASKS_PATH: &str = "/gw-tasks/tasks";

/// [`TaskGateway`] over the task backend's `/gw-tasks/tasks` resource.
#[derive(Clone)]
pub struct HttpTaskGateway {
    api: ApiClient,
}

impl HttpTaskGateway {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn task_path(ids: &str) -> String {
        format!("{TASKS_PATH}/{ids}")
    }
}

#[async_trait]
impl TaskGateway for HttpTaskGateway {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<PageResponse<Task>> {
        self.api
            .get(
                TASKS_PATH,
                &[("page", page.to_string()), ("pageSize", page_size.to_string())],
            )
            .await
    }

    async fn find_many(&self, ids: &[TaskId]) -> Result<Vec<Task>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.api.get(&Self::task_path(&joined), &[]).await
    }

    async fn create_many(&self, requests: &[TaskRequest]) -> Result<Vec<Task>> {
        self.api.post(TASKS_PATH, requests).await
    }

    async fn delete_one(&self, id: TaskId) -> Result<OperationResult> {
        self.api.delete(&Self::task_path(&id.to_string())).await
    }

    async fn update_one(&self, id: TaskId, patch: &TaskPatch) -> Result<OperationResult> {
        self.api.put(&Self::task_path(&id.to_string()), patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::http::test_support::{ScriptedTransport, StaticTokens};
    use taskdesk_core::task::{TaskPriority, TaskStatus};

    fn gateway(transport: std::sync::Arc<ScriptedTransport>) -> HttpTaskGateway {
        HttpTaskGateway::new(ApiClient::new(
            "tasks",
            "http://localhost:8080",
            transport,
            StaticTokens::new(Some("token")),
        ))
    }

    const TASK_JSON: &str = r#"{"id":3,"name":"Ship","status":"OPEN","priority":"LOW","description":""}"#;

    #[tokio::test]
    async fn test_fetch_page_sends_page_params() {
        let transport = ScriptedTransport::new();
        transport.push(
            200,
            &format!(
                r#"{{"content":[{TASK_JSON}],"page":1,"size":20,"totalElements":21,"totalPages":2}}"#
            ),
        );

        let page = gateway(transport.clone()).fetch_page(1, 20).await.unwrap();
        assert_eq!(page.content.len(), 1);
        assert!(!page.has_more());

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "http://localhost:8080/gw-tasks/tasks");
        assert_eq!(
            request.query,
            vec![
                ("page".to_string(), "1".to_string()),
                ("pageSize".to_string(), "20".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_find_many_joins_ids() {
        let transport = ScriptedTransport::new();
        transport.push(200, &format!("[{TASK_JSON}]"));
        let gateway = gateway(transport.clone());

        let tasks = gateway.find_many(&[3, 9]).await.unwrap();
        assert_eq!(tasks[0].id, 3);
        assert_eq!(
            transport.requests()[0].url,
            "http://localhost:8080/gw-tasks/tasks/3,9"
        );

        assert!(gateway.find_many(&[]).await.unwrap().is_empty());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_create_many_posts_array() {
        let transport = ScriptedTransport::new();
        transport.push(200, &format!("[{TASK_JSON}]"));
        let request = TaskRequest {
            name: "Ship".to_string(),
            status: TaskStatus::Open,
            priority: TaskPriority::Low,
            description: String::new(),
            estimate_date: 1_717_200_000_000,
            assign_to_user_id: "u-1".to_string(),
            user_name: "amina".to_string(),
        };

        let created = gateway(transport.clone())
            .create_many(std::slice::from_ref(&request))
            .await
            .unwrap();
        assert_eq!(created.len(), 1);

        let sent = transport.requests()[0].body.clone().unwrap();
        assert_eq!(sent[0]["assignToUserId"], "u-1");
        assert_eq!(sent[0]["status"], "OPEN");
    }

    #[tokio::test]
    async fn test_update_and_delete_paths() {
        let transport = ScriptedTransport::new();
        transport.push(200, r#"{"affectedRecords":1,"message":"updated"}"#);
        transport.push(200, r#"{"affectedRecords":0,"message":"missing"}"#);
        let gateway = gateway(transport.clone());

        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        assert!(gateway.update_one(5, &patch).await.unwrap().affected_any());
        assert!(!gateway.delete_one(5).await.unwrap().affected_any());

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::Put);
        assert_eq!(requests[0].body, Some(serde_json::json!({ "status": "DONE" })));
        assert_eq!(requests[1].method, Method::Delete);
        assert_eq!(requests[1].url, "http://localhost:8080/gw-tasks/tasks/5");
    }
}
