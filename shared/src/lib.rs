//! Shared library for the reports analysis Lambda.
//!
//! Scans the configured DynamoDB tables, hands the records and the user's
//! query to a Bedrock model, and wraps the answer in a Lambda response.

pub mod analysis;
pub mod config;
pub mod error;
pub mod model;
pub mod models;
pub mod prompt;
pub mod store;

pub use analysis::Analyzer;
pub use config::Config;
pub use error::{Error, Result};
pub use model::{BedrockModel, ModelClient};
pub use models::{extract_user_query, InvokeResponse};
pub use store::{DynamoStore, TableData, TableStore};
