use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ItemId = i64;

/// A billable item. The GST percentage is the one supplied when the item was
/// first created; later references with a different rate leave it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub gst_percentage: f64,
    pub created_at: DateTime<Utc>,
}
