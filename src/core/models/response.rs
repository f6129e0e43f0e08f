use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Response {
    pub id: i64,
    pub poll_id: i64,
    pub selected_option_ids: Vec<i64>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub poll_id: i64,
    pub selected_option_ids: Vec<i64>,
    pub submitted_at: DateTime<Utc>,
}

/// Body of the "Submit Vote" form.
#[derive(Debug, Clone, Deserialize)]
pub struct Submit {
    pub option_ids: Vec<i64>,
}
