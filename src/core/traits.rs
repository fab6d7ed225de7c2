use crate::core::{errors::QueryError, types::CallParams};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait QueryApi {
    /// Invoke `action` and return the compacted response document
    async fn call(&self, action: &str, params: CallParams) -> Result<Value, QueryError>;
}
