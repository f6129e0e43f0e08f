//! Store backed by three Baserow tables reached over the rows REST API.
//!
//! Every trait method issues one request (list methods follow pagination) and
//! maps a non-2xx status to `Error::StoreRejected`. Nothing is retried.
use crate::config::BaserowConfig;
use crate::core::models::{
    option::{Insert as OptionInsert, Opt},
    poll::{Insert as PollInsert, Poll},
    response::{Insert as ResponseInsert, Response},
};
use crate::core::ports::repository::{OptionCommon, PollCommon, ResponseCommon};
use crate::error::Error;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::json;

const PAGE_SIZE: &str = "200";

pub struct BaserowStore {
    client: Client,
    url: String,
    token: String,
    votes_table: u64,
    options_table: u64,
    responses_table: u64,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    next: Option<String>,
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct LinkRow {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct VoteRow {
    id: i64,
    #[serde(default)]
    question: String,
    #[serde(default, deserialize_with = "number")]
    max_selections: i64,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    uuid: String,
}

#[derive(Debug, Deserialize)]
struct OptionRow {
    id: i64,
    #[serde(default)]
    vote: Vec<LinkRow>,
    #[serde(default)]
    option_text: String,
    #[serde(default, deserialize_with = "number")]
    count: i64,
}

#[derive(Debug, Deserialize)]
struct ResponseRow {
    id: i64,
    #[serde(default)]
    vote: Vec<LinkRow>,
    #[serde(default)]
    selected_options: String,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Baserow returns number fields as decimal strings, older rows may hold plain numbers or null.
fn number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Number>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Number::Int(n)) => Ok(n),
        Some(Number::Float(f)) => Ok(f as i64),
        Some(Number::Text(s)) if s.trim().is_empty() => Ok(0),
        Some(Number::Text(s)) => s.trim().parse::<f64>().map(|f| f as i64).map_err(de::Error::custom),
    }
}

impl VoteRow {
    /// Rows Baserow adds on its own (a fresh table's example rows, rows typed in
    /// the UI) carry no share id and are not polls.
    fn is_blank(&self) -> bool {
        self.uuid.trim().is_empty()
    }
}

fn first_link(links: &[LinkRow]) -> i64 {
    links.first().map(|l| l.id).unwrap_or_default()
}

impl From<VoteRow> for Poll {
    fn from(row: VoteRow) -> Self {
        Poll {
            id: row.id,
            question: row.question,
            max_selections: u32::try_from(row.max_selections.max(1)).unwrap_or(u32::MAX),
            created_at: row.created_at.unwrap_or_default(),
            unique_id: row.uuid,
        }
    }
}

impl From<OptionRow> for Opt {
    fn from(row: OptionRow) -> Self {
        Opt {
            id: row.id,
            poll_id: first_link(&row.vote),
            text: row.option_text,
            count: row.count.max(0),
        }
    }
}

impl TryFrom<ResponseRow> for Response {
    type Error = Error;

    fn try_from(row: ResponseRow) -> Result<Self, Self::Error> {
        Ok(Response {
            id: row.id,
            poll_id: first_link(&row.vote),
            selected_option_ids: serde_json::from_str(&row.selected_options)?,
            submitted_at: row.submitted_at.unwrap_or_default(),
        })
    }
}

impl BaserowStore {
    pub fn new(config: &BaserowConfig) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.api_token.clone(),
            votes_table: config.votes_table_id,
            options_table: config.options_table_id,
            responses_table: config.responses_table_id,
        })
    }

    fn rows_url(&self, table: u64) -> String {
        format!("{}/api/database/rows/table/{}/", self.url, table)
    }

    fn row_url(&self, table: u64, id: i64) -> String {
        format!("{}{}/", self.rows_url(table), id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .query(&[("user_field_names", "true")])
    }

    async fn send<T>(req: RequestBuilder) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let resp = Self::check(req.send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn send_empty(req: RequestBuilder) -> Result<(), Error> {
        Self::check(req.send().await?).await?;
        Ok(())
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::StoreRejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch_page<T>(&self, url: &str, filter: &[(&str, String)], page: usize, size: &str) -> Result<Page<T>, Error>
    where
        T: DeserializeOwned,
    {
        let page = page.to_string();
        let req = self.request(Method::GET, url).query(filter).query(&[("page", page.as_str()), ("size", size)]);
        Self::send(req).await
    }

    async fn list_rows<T>(&self, table: u64, filter: &[(&str, String)]) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
    {
        let url = self.rows_url(table);
        let mut rows = Vec::new();
        let mut page = 1;
        loop {
            let Page { next, results } = self.fetch_page(&url, filter, page, PAGE_SIZE).await?;
            rows.extend(results);
            if next.is_none() {
                break;
            }
            page += 1;
        }
        debug!("fetched {} rows from table {}", rows.len(), table);
        Ok(rows)
    }

    fn by_poll(poll_id: i64) -> [(&'static str, String); 1] {
        [("filter__vote__link_row_has", poll_id.to_string())]
    }
}

impl PollCommon for BaserowStore {
    async fn create_poll(&self, data: PollInsert) -> Result<Poll, Error> {
        let body = json!({
            "question": data.question,
            "max_selections": data.max_selections,
            "created_at": data.created_at.to_rfc3339(),
            "uuid": data.unique_id,
        });
        let row: VoteRow = Self::send(self.request(Method::POST, &self.rows_url(self.votes_table)).json(&body)).await?;
        Ok(row.into())
    }

    async fn get_poll_by_unique_id(&self, unique_id: &str) -> Result<Option<Poll>, Error> {
        let filter = [("filter__uuid__equal", unique_id.to_owned())];
        let page: Page<VoteRow> = self.fetch_page(&self.rows_url(self.votes_table), &filter, 1, "1").await?;
        Ok(page.results.into_iter().next().map(Poll::from))
    }

    async fn list_polls(&self) -> Result<Vec<Poll>, Error> {
        let rows: Vec<VoteRow> = self.list_rows(self.votes_table, &[]).await?;
        let (blank, rows): (Vec<VoteRow>, Vec<VoteRow>) = rows.into_iter().partition(VoteRow::is_blank);
        if !blank.is_empty() {
            debug!("ignoring {} votes rows without uuid", blank.len());
        }
        Ok(rows.into_iter().map(Poll::from).collect())
    }

    async fn delete_poll(&self, id: i64) -> Result<(), Error> {
        Self::send_empty(self.request(Method::DELETE, &self.row_url(self.votes_table, id))).await
    }
}

impl OptionCommon for BaserowStore {
    async fn add_option(&self, option: OptionInsert) -> Result<Opt, Error> {
        let body = json!({
            "vote": [option.poll_id],
            "option_text": option.text,
            "count": 0,
        });
        let row: OptionRow = Self::send(self.request(Method::POST, &self.rows_url(self.options_table)).json(&body)).await?;
        Ok(row.into())
    }

    async fn list_options(&self, poll_id: i64) -> Result<Vec<Opt>, Error> {
        let rows: Vec<OptionRow> = self.list_rows(self.options_table, &Self::by_poll(poll_id)).await?;
        let mut opts: Vec<Opt> = rows.into_iter().map(Opt::from).collect();
        opts.sort_by_key(|o| o.id);
        Ok(opts)
    }

    /// Reads the row and writes it back plus one; the rows API offers no atomic increment.
    async fn increment_option_count(&self, id: i64) -> Result<i64, Error> {
        let url = self.row_url(self.options_table, id);
        let row: OptionRow = match Self::send(self.request(Method::GET, &url)).await {
            Err(Error::StoreRejected { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Err(Error::NotFound(format!("option {}", id)));
            }
            other => other?,
        };
        let count = row.count.max(0) + 1;
        let updated: OptionRow = Self::send(self.request(Method::PATCH, &url).json(&json!({ "count": count }))).await?;
        Ok(updated.count)
    }

    async fn delete_option(&self, id: i64) -> Result<(), Error> {
        Self::send_empty(self.request(Method::DELETE, &self.row_url(self.options_table, id))).await
    }
}

impl ResponseCommon for BaserowStore {
    async fn record_response(&self, response: ResponseInsert) -> Result<Response, Error> {
        let body = json!({
            "vote": [response.poll_id],
            "selected_options": serde_json::to_string(&response.selected_option_ids)?,
            "submitted_at": response.submitted_at.to_rfc3339(),
        });
        let row: ResponseRow = Self::send(self.request(Method::POST, &self.rows_url(self.responses_table)).json(&body)).await?;
        row.try_into()
    }

    async fn list_responses(&self, poll_id: i64) -> Result<Vec<Response>, Error> {
        let rows: Vec<ResponseRow> = self.list_rows(self.responses_table, &Self::by_poll(poll_id)).await?;
        let mut responses = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match Response::try_from(row) {
                Ok(r) => responses.push(r),
                Err(e) => warn!("skipping response row {} with unreadable selection: {}", id, e),
            }
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VOTES: &str = "/api/database/rows/table/1/";
    const OPTIONS: &str = "/api/database/rows/table/2/";

    fn store(url: String) -> BaserowStore {
        BaserowStore::new(&BaserowConfig {
            url,
            api_token: "secret".into(),
            votes_table_id: 1,
            options_table_id: 2,
            responses_table_id: 3,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn vote_row(id: i64, uuid: &str) -> serde_json::Value {
        json!({"id": id, "question": format!("q{}", id), "max_selections": "1", "created_at": "2024-03-01T10:00:00Z", "uuid": uuid})
    }

    #[test]
    fn test_vote_row_with_string_numbers() {
        let row: VoteRow = serde_json::from_str(
            r#"{"id": 7, "order": "1.00000000000000000000", "question": "Pizza or Salad?",
                "max_selections": "2", "created_at": "2024-03-01T10:00:00Z", "uuid": "4f1c"}"#,
        )
        .unwrap();
        let poll = Poll::from(row);
        assert_eq!(poll.id, 7);
        assert_eq!(poll.max_selections, 2);
        assert_eq!(poll.unique_id, "4f1c");
        assert_eq!(poll.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_vote_row_missing_limit_means_single() {
        let row: VoteRow = serde_json::from_str(r#"{"id": 1, "question": "q", "max_selections": null, "created_at": null, "uuid": "x"}"#).unwrap();
        assert_eq!(Poll::from(row).max_selections, 1);
    }

    #[test]
    fn test_option_row() {
        let row: OptionRow = serde_json::from_str(r#"{"id": 3, "vote": [{"id": 7, "value": "Pizza or Salad?"}], "option_text": "Pizza", "count": "4"}"#).unwrap();
        assert_eq!(
            Opt::from(row),
            Opt {
                id: 3,
                poll_id: 7,
                text: "Pizza".into(),
                count: 4,
            }
        );
    }

    #[test]
    fn test_response_row() {
        let row: ResponseRow =
            serde_json::from_str(r#"{"id": 9, "vote": [{"id": 7, "value": "q"}], "selected_options": "[3, 4]", "submitted_at": "2024-03-01T10:05:00Z"}"#).unwrap();
        let response = Response::try_from(row).unwrap();
        assert_eq!(response.poll_id, 7);
        assert_eq!(response.selected_option_ids, vec![3, 4]);
    }

    #[test]
    fn test_response_row_bad_selection() {
        let row: ResponseRow = serde_json::from_str(r#"{"id": 9, "vote": [], "selected_options": "three", "submitted_at": null}"#).unwrap();
        assert!(matches!(Response::try_from(row), Err(Error::Serde(_))));
    }

    #[test]
    fn test_page() {
        let page: Page<LinkRow> = serde_json::from_str(r#"{"count": 2, "next": null, "previous": null, "results": [{"id": 1}, {"id": 2}]}"#).unwrap();
        assert!(page.next.is_none());
        assert_eq!(page.results.len(), 2);
    }

    #[test]
    fn test_urls() {
        let store = BaserowStore::new(&BaserowConfig {
            url: "https://api.baserow.io".into(),
            api_token: "t".into(),
            votes_table_id: 1,
            options_table_id: 2,
            responses_table_id: 3,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(store.rows_url(2), "https://api.baserow.io/api/database/rows/table/2/");
        assert_eq!(store.row_url(2, 5), "https://api.baserow.io/api/database/rows/table/2/5/");
    }

    #[test]
    fn test_example_row_is_blank() {
        let row: VoteRow = serde_json::from_str(r#"{"id": 1, "order": "1.0", "Name": null, "Notes": null, "Active": false}"#).unwrap();
        assert!(row.is_blank());
    }

    #[tokio::test]
    async fn test_list_polls_follows_pages_and_skips_blank_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(VOTES))
            .and(header("Authorization", "Token secret"))
            .and(query_param("user_field_names", "true"))
            .and(query_param("size", "200"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "next": format!("{}{}?page=2", server.uri(), VOTES),
                "results": [{"id": 1, "Name": null, "Notes": null, "Active": false}, vote_row(3, "a")],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(VOTES))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"next": null, "results": [vote_row(4, "b")]})))
            .expect(1)
            .mount(&server)
            .await;

        let polls = store(server.uri()).list_polls().await.unwrap();
        let ids: Vec<&str> = polls.iter().map(|p| p.unique_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_get_poll_filters_by_uuid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(VOTES))
            .and(query_param("filter__uuid__equal", "abc"))
            .and(query_param("size", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"next": null, "results": [vote_row(7, "abc")]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(VOTES))
            .and(query_param("filter__uuid__equal", "gone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"next": null, "results": []})))
            .mount(&server)
            .await;

        let store = store(server.uri());
        assert_eq!(store.get_poll_by_unique_id("abc").await.unwrap().unwrap().id, 7);
        assert!(store.get_poll_by_unique_id("gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_options_filters_by_link_and_sorts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(OPTIONS))
            .and(query_param("filter__vote__link_row_has", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"next": null, "results": [
                {"id": 12, "vote": [{"id": 7, "value": "q"}], "option_text": "Salad", "count": "0"},
                {"id": 11, "vote": [{"id": 7, "value": "q"}], "option_text": "Pizza", "count": "2"},
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        let opts = store(server.uri()).list_options(7).await.unwrap();
        let texts: Vec<&str> = opts.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Pizza", "Salad"]);
        assert_eq!(opts[0].count, 2);
    }

    #[tokio::test]
    async fn test_increment_reads_then_patches() {
        let server = MockServer::start().await;
        let row = "/api/database/rows/table/2/11/";
        Mock::given(method("GET"))
            .and(path(row))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 11, "vote": [{"id": 7}], "option_text": "Pizza", "count": "4"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(row))
            .and(header("Authorization", "Token secret"))
            .and(body_json(json!({"count": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 11, "vote": [{"id": 7}], "option_text": "Pizza", "count": "5"})))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(store(server.uri()).increment_option_count(11).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_increment_missing_option() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/database/rows/table/2/99/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "ERROR_ROW_DOES_NOT_EXIST"})))
            .mount(&server)
            .await;
        Mock::given(method("PATCH")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let res = store(server.uri()).increment_option_count(99).await;
        assert!(matches!(res, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejected_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VOTES))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let res = store(server.uri())
            .create_poll(PollInsert {
                question: "q".into(),
                max_selections: 1,
                created_at: Utc::now(),
                unique_id: "u".into(),
            })
            .await;
        match res {
            Err(e @ Error::StoreRejected { .. }) => {
                assert!(e.is_store_failure());
                assert_eq!(e.to_string(), "store rejected request (401): invalid token");
            }
            other => panic!("expected a rejection, got {:?}", other),
        }
    }
}
