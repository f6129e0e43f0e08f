use crate::core::models::{option::Opt, poll::Poll, response::Response};
use itertools::Itertools;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Row {
    pub option_id: i64,
    pub option_text: String,
    pub votes: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PollResults {
    pub question: String,
    pub total_responses: i64,
    pub total_votes: i64,
    pub rows: Vec<Row>,
}

impl PollResults {
    /// Counts every option from the stored responses, so the result never depends on the per-option counter.
    pub fn tally(poll: &Poll, options: &[Opt], responses: &[Response]) -> Self {
        let counts = responses.iter().flat_map(|r| r.selected_option_ids.iter().copied().unique()).counts();
        let votes_of = |opt: &Opt| counts.get(&opt.id).copied().unwrap_or(0) as i64;
        let total_votes: i64 = options.iter().map(votes_of).sum();
        let rows = options
            .iter()
            .map(|opt| {
                let votes = votes_of(opt);
                Row {
                    option_id: opt.id,
                    option_text: opt.text.clone(),
                    votes,
                    percentage: percentage(votes, total_votes),
                }
            })
            .collect();
        Self {
            question: poll.question.clone(),
            total_responses: responses.len() as i64,
            total_votes,
            rows,
        }
    }
}

fn percentage(votes: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 / total as f64 * 1000.0).round() / 10.0
}
