//! Fetch-then-infer request pipeline.

use serde_json::Value;
use tracing::{error, info, warn};

use crate::model::ModelClient;
use crate::models::{extract_user_query, AnalysisBody, InvokeResponse};
use crate::prompt::build_prompt;
use crate::store::{fetch_all, TableStore};
use crate::{Error, Result};

/// Handles one analysis request against a table store and a model.
pub struct Analyzer<S, M> {
    store: S,
    model: M,
    tables: Vec<String>,
}

impl<S, M> Analyzer<S, M>
where
    S: TableStore,
    M: ModelClient,
{
    pub fn new(store: S, model: M, tables: Vec<String>) -> Self {
        Self {
            store,
            model,
            tables,
        }
    }

    /// Process an invocation event into a response envelope.
    pub async fn handle(&self, event: &Value) -> InvokeResponse {
        match self.analyze(event).await {
            Ok(response) => response,
            Err(e) => {
                if e.status_code() < 500 {
                    warn!(error = %e, "Rejected analysis request");
                } else {
                    error!(error = %e, "Analysis request failed");
                }
                InvokeResponse::from_error(&e)
            }
        }
    }

    async fn analyze(&self, event: &Value) -> Result<InvokeResponse> {
        let user_query = extract_user_query(event)?;

        let data = fetch_all(&self.store, &self.tables).await;
        info!(tables = data.len(), requested = self.tables.len(), "Table data collected");

        let answer = self.ask(&user_query, &build_prompt(&user_query, &data)).await;

        InvokeResponse::json(
            200,
            &AnalysisBody {
                user_query: &user_query,
                dynamodb_data: &data,
                bedrock_context: &answer,
            },
        )
    }

    // Model failures are reported in the answer text, not as a failed request.
    async fn ask(&self, user_query: &str, prompt: &str) -> String {
        match self.model.complete(prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, query = %user_query, "Error invoking Bedrock");
                format!("Error invoking Bedrock: {}", describe(&e))
            }
        }
    }
}

fn describe(err: &Error) -> String {
    match err {
        Error::Aws(message) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Item;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        tables: HashMap<String, Vec<Item>>,
        scanned: Mutex<Vec<String>>,
    }

    impl FakeStore {
        fn with(mut self, table: &str, rows: Value) -> Self {
            let items: Vec<Item> = rows
                .as_array()
                .unwrap()
                .iter()
                .map(|row| row.as_object().unwrap().clone())
                .collect();
            self.tables.insert(table.to_string(), items);
            self
        }
    }

    #[async_trait]
    impl TableStore for FakeStore {
        async fn scan_table(&self, table: &str) -> Result<Vec<Item>> {
            self.scanned.lock().unwrap().push(table.to_string());
            self.tables
                .get(table)
                .cloned()
                .ok_or_else(|| Error::Aws(format!("table {} not found", table)))
        }
    }

    struct FakeModel {
        reply: std::result::Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeModel {
        fn answering(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for FakeModel {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(Error::Aws)
        }
    }

    fn tables() -> Vec<String> {
        ["staffListTable", "ReportsTable", "tagListTable", "userTable"]
            .iter()
            .map(|t| t.to_string())
            .collect()
    }

    fn body_of(response: &InvokeResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_successful_analysis() {
        let store = FakeStore::default()
            .with("staffListTable", json!([{"name": "Ana"}]))
            .with("ReportsTable", json!([{"id": "r1", "status": "open"}]))
            .with("tagListTable", json!([]))
            .with("userTable", json!([{"email": "a@example.com"}]));
        let analyzer = Analyzer::new(store, FakeModel::answering("One open report."), tables());

        let response = analyzer.handle(&json!({"userQuery": "How many open reports?"})).await;

        assert_eq!(response.status_code, 200);
        let body = body_of(&response);
        assert_eq!(body["user_query"], "How many open reports?");
        assert_eq!(body["bedrock_context"], "One open report.");
        assert_eq!(body["dynamodb_data"]["ReportsTable"][0]["status"], "open");
        assert_eq!(body["dynamodb_data"]["tagListTable"], json!([]));

        let prompts = analyzer.model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("User Query: How many open reports?"));
        assert!(prompts[0].contains(r#""ReportsTable":[{"id":"r1","status":"open"}]"#));
    }

    #[tokio::test]
    async fn test_missing_query_short_circuits() {
        let analyzer = Analyzer::new(FakeStore::default(), FakeModel::answering("unused"), tables());

        let response = analyzer.handle(&json!({"query": "wrong key"})).await;

        assert_eq!(response.status_code, 400);
        assert_eq!(body_of(&response), json!({"error": "No userQuery provided in event"}));
        assert!(analyzer.store.scanned.lock().unwrap().is_empty());
        assert!(analyzer.model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_null_event() {
        let analyzer = Analyzer::new(FakeStore::default(), FakeModel::answering("unused"), tables());
        let response = analyzer.handle(&Value::Null).await;
        assert_eq!(response.status_code, 400);
    }

    #[tokio::test]
    async fn test_failed_tables_are_omitted() {
        let store = FakeStore::default().with("userTable", json!([{"id": 1}]));
        let analyzer = Analyzer::new(store, FakeModel::answering("ok"), tables());

        let response = analyzer.handle(&json!({"userQuery": "who?"})).await;

        assert_eq!(response.status_code, 200);
        assert_eq!(*analyzer.store.scanned.lock().unwrap(), tables());
        assert_eq!(body_of(&response)["dynamodb_data"], json!({"userTable": [{"id": 1}]}));
    }

    #[tokio::test]
    async fn test_model_failure_becomes_answer_text() {
        let analyzer = Analyzer::new(
            FakeStore::default(),
            FakeModel::failing("ThrottlingException: slow down"),
            tables(),
        );

        let response = analyzer
            .handle(&json!({"arguments": {"userQuery": "summarise"}}))
            .await;

        assert_eq!(response.status_code, 200);
        let body = body_of(&response);
        assert_eq!(body["user_query"], "summarise");
        assert_eq!(
            body["bedrock_context"],
            "Error invoking Bedrock: ThrottlingException: slow down"
        );
        assert_eq!(body["dynamodb_data"], json!({}));
    }
}
