//! In-process store, used for local runs with `STORE_BACKEND=memory` and by the tests.
use crate::core::models::{
    option::{Insert as OptionInsert, Opt},
    poll::{Insert as PollInsert, Poll},
    response::{Insert as ResponseInsert, Response},
};
use crate::core::ports::repository::{OptionCommon, PollCommon, ResponseCommon};
use crate::error::Error;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    polls: Vec<Poll>,
    options: Vec<Opt>,
    responses: Vec<Response>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // rows are pushed whole, a poisoned lock still guards consistent tables
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    pub fn response_count(&self) -> usize {
        self.tables().responses.len()
    }
}

impl PollCommon for MemoryStore {
    async fn create_poll(&self, data: PollInsert) -> Result<Poll, Error> {
        let mut tables = self.tables();
        let poll = Poll {
            id: tables.next_id(),
            question: data.question,
            max_selections: data.max_selections,
            created_at: data.created_at,
            unique_id: data.unique_id,
        };
        tables.polls.push(poll.clone());
        Ok(poll)
    }

    async fn get_poll_by_unique_id(&self, unique_id: &str) -> Result<Option<Poll>, Error> {
        Ok(self.tables().polls.iter().find(|p| p.unique_id == unique_id).cloned())
    }

    async fn list_polls(&self) -> Result<Vec<Poll>, Error> {
        Ok(self.tables().polls.clone())
    }

    async fn delete_poll(&self, id: i64) -> Result<(), Error> {
        let mut tables = self.tables();
        let before = tables.polls.len();
        tables.polls.retain(|p| p.id != id);
        if tables.polls.len() == before {
            return Err(Error::NotFound(format!("poll {}", id)));
        }
        Ok(())
    }
}

impl OptionCommon for MemoryStore {
    async fn add_option(&self, option: OptionInsert) -> Result<Opt, Error> {
        let mut tables = self.tables();
        if !tables.polls.iter().any(|p| p.id == option.poll_id) {
            return Err(Error::NotFound(format!("poll {}", option.poll_id)));
        }
        let opt = Opt {
            id: tables.next_id(),
            poll_id: option.poll_id,
            text: option.text,
            count: 0,
        };
        tables.options.push(opt.clone());
        Ok(opt)
    }

    async fn list_options(&self, poll_id: i64) -> Result<Vec<Opt>, Error> {
        Ok(self.tables().options.iter().filter(|o| o.poll_id == poll_id).cloned().collect())
    }

    async fn increment_option_count(&self, id: i64) -> Result<i64, Error> {
        let mut tables = self.tables();
        let opt = tables
            .options
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| Error::NotFound(format!("option {}", id)))?;
        opt.count += 1;
        Ok(opt.count)
    }

    async fn delete_option(&self, id: i64) -> Result<(), Error> {
        let mut tables = self.tables();
        let before = tables.options.len();
        tables.options.retain(|o| o.id != id);
        if tables.options.len() == before {
            return Err(Error::NotFound(format!("option {}", id)));
        }
        Ok(())
    }
}

impl ResponseCommon for MemoryStore {
    async fn record_response(&self, response: ResponseInsert) -> Result<Response, Error> {
        let mut tables = self.tables();
        let response = Response {
            id: tables.next_id(),
            poll_id: response.poll_id,
            selected_option_ids: response.selected_option_ids,
            submitted_at: response.submitted_at,
        };
        tables.responses.push(response.clone());
        Ok(response)
    }

    async fn list_responses(&self, poll_id: i64) -> Result<Vec<Response>, Error> {
        Ok(self.tables().responses.iter().filter(|r| r.poll_id == poll_id).cloned().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;

    async fn seeded() -> (MemoryStore, Poll) {
        let store = MemoryStore::new();
        let poll = store
            .create_poll(PollInsert {
                question: "Lunch?".into(),
                max_selections: 1,
                created_at: Utc::now(),
                unique_id: "abc".into(),
            })
            .await
            .unwrap();
        (store, poll)
    }

    #[tokio::test]
    async fn test_option_counter() {
        let (store, poll) = seeded().await;
        let opt = store.add_option(OptionInsert { poll_id: poll.id, text: "Soup".into() }).await.unwrap();
        assert_eq!(opt.count, 0);
        assert_eq!(store.increment_option_count(opt.id).await.unwrap(), 1);
        assert_eq!(store.increment_option_count(opt.id).await.unwrap(), 2);
        assert_eq!(store.list_options(poll.id).await.unwrap()[0].count, 2);
        assert!(matches!(store.increment_option_count(9999).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_option_needs_poll() {
        let store = MemoryStore::new();
        let res = store.add_option(OptionInsert { poll_id: 42, text: "Soup".into() }).await;
        assert!(matches!(res, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lookup_and_delete() {
        let (store, poll) = seeded().await;
        assert_eq!(store.get_poll_by_unique_id("abc").await.unwrap(), Some(poll.clone()));
        assert_eq!(store.get_poll_by_unique_id("nope").await.unwrap(), None);
        store.delete_poll(poll.id).await.unwrap();
        assert!(store.list_polls().await.unwrap().is_empty());
        assert!(store.delete_poll(poll.id).await.is_err());
    }
}
