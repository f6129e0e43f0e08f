use crate::core::models::result::PollResults;
use crate::core::ports::repository::{ResponseCommon, Store};
use crate::core::services::vote::resolve_poll;
use crate::error::Error;

pub async fn poll_results<S>(store: &S, unique_id: &str) -> Result<PollResults, Error>
where
    S: Store,
{
    let (poll, options) = resolve_poll(store, unique_id).await?;
    let responses = ResponseCommon::list_responses(store, poll.id).await?;
    Ok(PollResults::tally(&poll, &options, &responses))
}
