use crate::core::models::option::{Opt, OptView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SelectionMode {
    #[default]
    Single,
    Multi,
}

impl SelectionMode {
    pub fn for_limit(max_selections: u32) -> Self {
        if max_selections == 1 {
            SelectionMode::Single
        } else {
            SelectionMode::Multi
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Poll {
    pub id: i64,
    pub question: String,
    pub max_selections: u32,
    pub created_at: DateTime<Utc>,
    pub unique_id: String,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub question: String,
    pub max_selections: u32,
    pub created_at: DateTime<Utc>,
    pub unique_id: String,
}

/// Body of the "Create Vote" form.
#[derive(Debug, Clone, Deserialize)]
pub struct PollCreate {
    pub question: String,
    #[serde(default = "default_max_selections")]
    pub max_selections: u32,
    pub options: Vec<String>,
}

fn default_max_selections() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedPoll {
    pub poll: Poll,
    pub options: Vec<Opt>,
    pub share_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollSummary {
    pub question: String,
    pub created_at: DateTime<Utc>,
    pub unique_id: String,
    pub share_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollView {
    pub question: String,
    pub max_selections: u32,
    pub selection_mode: SelectionMode,
    pub options: Vec<OptView>,
    pub share_url: String,
}

impl PollView {
    pub fn new(poll: &Poll, options: &[Opt], share_url: String) -> Self {
        Self {
            question: poll.question.clone(),
            max_selections: poll.max_selections,
            selection_mode: SelectionMode::for_limit(poll.max_selections),
            options: options.iter().map(OptView::from).collect(),
            share_url,
        }
    }
}

pub fn share_url(public_base_url: &str, unique_id: &str) -> String {
    format!("{}/?vote={}", public_base_url.trim_end_matches('/'), unique_id)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_selection_mode() {
        assert_eq!(SelectionMode::for_limit(1), SelectionMode::Single);
        assert_eq!(SelectionMode::for_limit(3), SelectionMode::Multi);
        assert_eq!(serde_json::to_string(&SelectionMode::Multi).unwrap(), "\"MULTI\"");
    }

    #[test]
    fn test_share_url() {
        assert_eq!(share_url("https://vote.example.com/", "abc"), "https://vote.example.com/?vote=abc");
    }

    #[test]
    fn test_create_defaults_to_single_selection() {
        let create: PollCreate = serde_json::from_str(r#"{"question":"Lunch?","options":["a","b"]}"#).unwrap();
        assert_eq!(create.max_selections, 1);
    }
}
