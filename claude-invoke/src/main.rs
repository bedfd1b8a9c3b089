//! Claude Invoke Lambda - Answers a user query over the reports tables.
//!
//! This Lambda is invoked by the AppSync resolver (or directly) and:
//! 1. Validates that the event carries a `userQuery`
//! 2. Scans each configured DynamoDB table
//! 3. Sends the query plus the table data to a Bedrock model
//! 4. Returns `{statusCode, body}` with the query, data and model answer

use aws_config::{BehaviorVersion, Region};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use shared::{Analyzer, BedrockModel, Config, DynamoStore, InvokeResponse};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

type AppState = Analyzer<DynamoStore, BedrockModel>;

async fn build_state() -> Result<AppState, Error> {
    let config = Config::from_env()?;

    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await;

    let store = DynamoStore::new(
        aws_sdk_dynamodb::Client::new(&aws_config),
        config.scan_max_pages,
    );
    let model = BedrockModel::new(aws_sdk_bedrockruntime::Client::new(&aws_config), &config);

    info!(
        region = %config.aws_region,
        model_id = %config.model_id,
        tables = ?config.table_names,
        "Claude invoke configured"
    );

    Ok(Analyzer::new(store, model, config.table_names))
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<Value>) -> Result<InvokeResponse, Error> {
    info!(request_id = %event.context.request_id, "Received analysis request");

    let response = state.handle(&event.payload).await;

    info!(status = response.status_code, "Analysis request complete");
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(build_state().await?);

    run(service_fn(move |event| {
        let state = state.clone();
        async move { handler(state, event).await }
    }))
    .await
}
