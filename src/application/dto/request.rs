//! Request DTOs
//!
//! Data structures for API request bodies.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::domain::TargetType;

fn default_limit() -> u32 {
    20
}

/// History query request
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_time_range"))]
pub struct QueryHistoryRequest {
    pub target_type: TargetType,

    #[validate(range(min = 1, message = "target_id must be positive"))]
    pub target_id: i64,

    /// Id of the last message of the previous page; 0 starts from the newest
    #[serde(default)]
    #[validate(range(min = 0, message = "cursor must not be negative"))]
    pub cursor: i64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: u32,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

fn validate_time_range(request: &QueryHistoryRequest) -> Result<(), ValidationError> {
    match (request.start_time, request.end_time) {
        (Some(start), Some(end)) if start > end => {
            let mut err = ValidationError::new("time_range");
            err.message = Some("start_time must not be after end_time".into());
            Err(err)
        }
        _ => Ok(()),
    }
}
