use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ClientId = i64;

/// A billed party. Names are unique ignoring case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
