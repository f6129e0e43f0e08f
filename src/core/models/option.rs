use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Opt {
    pub id: i64,
    pub poll_id: i64,
    pub text: String,
    pub count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Insert {
    pub poll_id: i64,
    pub text: String,
}

/// What a respondent sees of an option, the stored count is left out.
#[derive(Debug, Clone, Serialize)]
pub struct OptView {
    pub id: i64,
    pub text: String,
}

impl From<&Opt> for OptView {
    fn from(opt: &Opt) -> Self {
        Self {
            id: opt.id,
            text: opt.text.clone(),
        }
    }
}
