//! Prompt construction for table analysis.

use crate::store::TableData;

/// Build the analysis prompt from the user's query and the scanned tables.
pub fn build_prompt(user_query: &str, data: &TableData) -> String {
    // Table data is plain JSON values keyed by strings, so encoding can't fail.
    let data_json = serde_json::to_string(data).unwrap_or_default();

    format!(
        "User Query: {user_query}\n\n\
         Task: Please analyze the provided DynamoDB data to answer the query.\n\n\
         Data: {data_json}\n\n\
         Please provide a structured analysis based on the user's query."
    )
}
