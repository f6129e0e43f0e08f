use crate::core::models::{
    option::{Insert as OptionInsert, Opt},
    poll::{share_url, CreatedPoll, Insert as PollInsert, Poll, PollCreate, PollSummary},
};
use crate::core::ports::repository::{OptionCommon, PollCommon, Store};
use crate::error::Error;
use chrono::Utc;
use itertools::Itertools;
use log::{info, warn};
use uuid::Uuid;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPoll {
    pub question: String,
    pub max_selections: u32,
    pub options: Vec<String>,
}

/// Trims the form input and drops blank option fields before checking it.
pub fn validate(create: PollCreate) -> Result<ValidPoll, Error> {
    let question = create.question.trim().to_owned();
    if question.is_empty() {
        return Err(Error::Validation("question must not be empty".into()));
    }
    if create.max_selections < 1 {
        return Err(Error::Validation("maximum selections must be at least 1".into()));
    }
    let options: Vec<String> = create.options.iter().map(|o| o.trim()).filter(|o| !o.is_empty()).map(String::from).collect();
    if options.len() < MIN_OPTIONS {
        return Err(Error::Validation(format!("at least {} options are required", MIN_OPTIONS)));
    }
    if options.len() > MAX_OPTIONS {
        return Err(Error::Validation(format!("at most {} options are allowed", MAX_OPTIONS)));
    }
    if let Some(dup) = options.iter().duplicates().next() {
        return Err(Error::Validation(format!("option \"{}\" is listed twice", dup)));
    }
    Ok(ValidPoll {
        question,
        max_selections: create.max_selections,
        options,
    })
}

pub async fn create_poll<S>(store: &S, public_base_url: &str, create: PollCreate) -> Result<CreatedPoll, Error>
where
    S: Store,
{
    let valid = validate(create)?;
    let poll = PollCommon::create_poll(
        store,
        PollInsert {
            question: valid.question,
            max_selections: valid.max_selections,
            created_at: Utc::now(),
            unique_id: Uuid::new_v4().to_string(),
        },
    )
    .await?;
    let mut options = Vec::with_capacity(valid.options.len());
    for text in valid.options {
        match OptionCommon::add_option(store, OptionInsert { poll_id: poll.id, text }).await {
            Ok(opt) => options.push(opt),
            Err(e) => {
                rollback(store, &poll, &options).await;
                return Err(e);
            }
        }
    }
    info!("created poll {} with {} options", poll.unique_id, options.len());
    Ok(CreatedPoll {
        share_url: share_url(public_base_url, &poll.unique_id),
        poll,
        options,
    })
}

// Best effort: a failed delete is logged and the remaining rows are still attempted.
async fn rollback<S>(store: &S, poll: &Poll, options: &[Opt])
where
    S: Store,
{
    warn!("rolling back partially created poll {}", poll.unique_id);
    for opt in options {
        if let Err(e) = OptionCommon::delete_option(store, opt.id).await {
            warn!("failed to delete option {} of poll {}: {}", opt.id, poll.unique_id, e);
        }
    }
    if let Err(e) = PollCommon::delete_poll(store, poll.id).await {
        warn!("failed to delete poll {}: {}", poll.unique_id, e);
    }
}

/// Newest first.
pub async fn list_polls<S>(store: &S, public_base_url: &str) -> Result<Vec<PollSummary>, Error>
where
    S: Store,
{
    let mut polls = PollCommon::list_polls(store).await?;
    polls.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(polls
        .into_iter()
        .map(|p| PollSummary {
            share_url: share_url(public_base_url, &p.unique_id),
            question: p.question,
            created_at: p.created_at,
            unique_id: p.unique_id,
        })
        .collect())
}
