//! Request DTOs
//!
//! Data structures for API request bodies.

use serde::Deserialize;
use validator::Validate;

/// Get-or-create DM conversation request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDmRequest {
    #[validate(range(min = 1, message = "userId1 must be a positive id"))]
    pub user_id1: i64,

    #[validate(range(min = 1, message = "userId2 must be a positive id"))]
    pub user_id2: i64,
}
