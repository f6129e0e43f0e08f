use crate::core::models::{
    option::{Insert as OptionInsert, Opt},
    poll::{Insert as PollInsert, Poll},
    response::{Insert as ResponseInsert, Response},
};
use crate::error::Error;

pub trait PollCommon {
    async fn create_poll(&self, data: PollInsert) -> Result<Poll, Error>;
    async fn get_poll_by_unique_id(&self, unique_id: &str) -> Result<Option<Poll>, Error>;
    async fn list_polls(&self) -> Result<Vec<Poll>, Error>;
    async fn delete_poll(&self, id: i64) -> Result<(), Error>;
}

pub trait OptionCommon {
    async fn add_option(&self, option: OptionInsert) -> Result<Opt, Error>;
    /// Options of a poll ordered by id, which is creation order.
    async fn list_options(&self, poll_id: i64) -> Result<Vec<Opt>, Error>;
    async fn increment_option_count(&self, id: i64) -> Result<i64, Error>;
    async fn delete_option(&self, id: i64) -> Result<(), Error>;
}

pub trait ResponseCommon {
    async fn record_response(&self, response: ResponseInsert) -> Result<Response, Error>;
    async fn list_responses(&self, poll_id: i64) -> Result<Vec<Response>, Error>;
}

pub trait Store: PollCommon + OptionCommon + ResponseCommon {}

impl<T> Store for T where T: PollCommon + OptionCommon + ResponseCommon {}
