use crate::core::models::{
    option::Opt,
    poll::{share_url, Poll, PollView},
    response::{Insert as ResponseInsert, Response, Submit},
};
use crate::core::ports::repository::{OptionCommon, PollCommon, ResponseCommon, Store};
use crate::error::Error;
use chrono::Utc;
use itertools::Itertools;
use log::{debug, warn};
use uuid::Uuid;

/// Looks up the poll behind a share link together with its options.
///
/// Identifiers that are not UUIDs cannot have been generated here and are
/// reported as not found without asking the store.
pub async fn resolve_poll<S>(store: &S, unique_id: &str) -> Result<(Poll, Vec<Opt>), Error>
where
    S: Store,
{
    if Uuid::parse_str(unique_id).is_err() {
        return Err(Error::NotFound("poll".into()));
    }
    let poll = PollCommon::get_poll_by_unique_id(store, unique_id)
        .await?
        .ok_or_else(|| Error::NotFound("poll".into()))?;
    let options = OptionCommon::list_options(store, poll.id).await?;
    Ok((poll, options))
}

pub async fn poll_view<S>(store: &S, public_base_url: &str, unique_id: &str) -> Result<PollView, Error>
where
    S: Store,
{
    let (poll, options) = resolve_poll(store, unique_id).await?;
    Ok(PollView::new(&poll, &options, share_url(public_base_url, &poll.unique_id)))
}

/// Checks a selection against the poll: 1..=max_selections distinct ids, all options of this poll.
pub fn validate_selection(poll: &Poll, options: &[Opt], option_ids: &[i64]) -> Result<(), Error> {
    check_selection_size(poll.max_selections, option_ids)?;
    if let Some(dup) = option_ids.iter().duplicates().next() {
        return Err(Error::Validation(format!("option {} selected twice", dup)));
    }
    if let Some(foreign) = option_ids.iter().find(|id| !options.iter().any(|o| o.id == **id)) {
        return Err(Error::Validation(format!("option {} does not belong to this poll", foreign)));
    }
    Ok(())
}

fn check_selection_size(max_selections: u32, option_ids: &[i64]) -> Result<(), Error> {
    if option_ids.is_empty() {
        return Err(Error::Validation("please select at least one option".into()));
    }
    if option_ids.len() > max_selections as usize {
        return Err(Error::Validation(format!("you can select at most {} options", max_selections)));
    }
    Ok(())
}

/// Records one response. The response row is the source of truth for results;
/// the per-option counters are bumped afterwards as a mirror for people
/// browsing the tables, and a failed bump only logs a warning.
pub async fn submit_response<S>(store: &S, unique_id: &str, submit: Submit) -> Result<Response, Error>
where
    S: Store,
{
    check_selection_size(u32::MAX, &submit.option_ids)?;
    let (poll, options) = resolve_poll(store, unique_id).await?;
    validate_selection(&poll, &options, &submit.option_ids)?;
    let response = ResponseCommon::record_response(
        store,
        ResponseInsert {
            poll_id: poll.id,
            selected_option_ids: submit.option_ids,
            submitted_at: Utc::now(),
        },
    )
    .await?;
    for id in &response.selected_option_ids {
        match OptionCommon::increment_option_count(store, *id).await {
            Ok(count) => debug!("option {} of poll {} now at {}", id, poll.unique_id, count),
            Err(e) => warn!("failed to bump counter of option {} of poll {}: {}", id, poll.unique_id, e),
        }
    }
    Ok(response)
}
