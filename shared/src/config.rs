//! Configuration management for the analysis Lambda.

use std::env;
use std::str::FromStr;

use crate::{Error, Result};

/// Bedrock model used when `MODEL_ID` is unset.
pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-haiku-20240307-v1:0";

/// Tables scanned when `TABLE_NAMES` is unset, in scan order.
pub const DEFAULT_TABLES: [&str; 4] = ["staffListTable", "ReportsTable", "tagListTable", "userTable"];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// AWS region for DynamoDB and Bedrock
    pub aws_region: String,
    /// Bedrock model id
    pub model_id: String,
    /// Tables to scan, in order
    pub table_names: Vec<String>,
    /// Maximum tokens the model may generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on scan pages per table
    pub scan_max_pages: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws_region: "us-east-1".to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            table_names: DEFAULT_TABLES.iter().map(|t| t.to_string()).collect(),
            max_tokens: 500,
            temperature: 0.5,
            scan_max_pages: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let table_names = match lookup("TABLE_NAMES") {
            Some(raw) => {
                let names: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                if names.is_empty() {
                    return Err(Error::Config("TABLE_NAMES contains no table names".to_string()));
                }
                names
            }
            None => defaults.table_names,
        };

        Ok(Self {
            aws_region: lookup("AWS_REGION").unwrap_or(defaults.aws_region),
            model_id: lookup("MODEL_ID").unwrap_or(defaults.model_id),
            table_names,
            max_tokens: parse_var(&lookup, "MAX_TOKENS", defaults.max_tokens)?,
            temperature: parse_var(&lookup, "TEMPERATURE", defaults.temperature)?,
            scan_max_pages: parse_var(&lookup, "SCAN_MAX_PAGES", defaults.scan_max_pages)?.max(1),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
