//! `anonvote setup`: creates the Votes, Options and Responses tables in a
//! Baserow database and prints the table ids for the environment.
use crate::config::SetupConfig;
use anyhow::{bail, Context};
use log::info;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct Created {
    id: u64,
}

#[derive(Debug)]
struct FieldSpec {
    name: &'static str,
    body: Value,
}

fn field(name: &'static str, kind: &str, extra: Value) -> FieldSpec {
    let mut body = json!({ "name": name, "type": kind });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.extend(extra.clone());
    }
    FieldSpec { name, body }
}

fn votes_fields() -> Vec<FieldSpec> {
    vec![
        field("question", "text", json!({})),
        field("max_selections", "number", json!({ "number_decimal_places": 0, "number_negative": false })),
        field("created_at", "date", json!({ "date_include_time": true, "date_format": "ISO" })),
        field("uuid", "text", json!({})),
    ]
}

fn options_fields(votes_table: u64) -> Vec<FieldSpec> {
    vec![
        field("vote", "link_row", json!({ "link_row_table_id": votes_table })),
        field("option_text", "text", json!({})),
        field("count", "number", json!({ "number_decimal_places": 0, "number_negative": false })),
    ]
}

fn responses_fields(votes_table: u64) -> Vec<FieldSpec> {
    vec![
        field("vote", "link_row", json!({ "link_row_table_id": votes_table })),
        field("selected_options", "long_text", json!({})),
        field("submitted_at", "date", json!({ "date_include_time": true, "date_format": "ISO" })),
    ]
}

#[derive(Debug, Deserialize)]
struct Rows {
    results: Vec<Created>,
}

struct Setup {
    client: Client,
    config: SetupConfig,
}

impl Setup {
    async fn send(&self, req: RequestBuilder, url: &str) -> anyhow::Result<reqwest::Response> {
        let resp = req
            .header(AUTHORIZATION, format!("JWT {}", self.config.jwt))
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("{} returned {}: {}", url, status, text);
        }
        Ok(resp)
    }

    async fn post(&self, url: String, body: &Value) -> anyhow::Result<Created> {
        let resp = self.send(self.client.post(&url).json(body), &url).await?;
        Ok(resp.json().await?)
    }

    /// A new Baserow table comes with example rows, which would show up as blank polls.
    async fn clear_rows(&self, table: u64) -> anyhow::Result<usize> {
        let url = format!("{}/api/database/rows/table/{}/", self.config.url, table);
        let rows: Rows = self.send(self.client.get(&url).query(&[("size", "200")]), &url).await?.json().await?;
        let ids: Vec<u64> = rows.results.iter().map(|r| r.id).collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let url = format!("{}batch-delete/", url);
        self.send(self.client.post(&url).json(&json!({ "items": ids })), &url).await?;
        Ok(ids.len())
    }

    async fn create_table(&self, name: &str, fields: Vec<FieldSpec>) -> anyhow::Result<u64> {
        let url = format!("{}/api/database/tables/database/{}/", self.config.url, self.config.database_id);
        let table = self.post(url, &json!({ "name": name })).await?;
        info!("{} table created with id {}", name, table.id);
        let cleared = self
            .clear_rows(table.id)
            .await
            .with_context(|| format!("failed to remove example rows of table {}", name))?;
        if cleared > 0 {
            info!("  removed {} example rows", cleared);
        }
        for field in fields {
            let url = format!("{}/api/database/fields/table/{}/", self.config.url, table.id);
            self.post(url, &field.body)
                .await
                .with_context(|| format!("failed to create field {} of table {}", field.name, name))?;
            info!("  field {} created", field.name);
        }
        Ok(table.id)
    }
}

pub async fn run(config: SetupConfig) -> anyhow::Result<()> {
    let setup = Setup { client: Client::new(), config };
    let votes = setup.create_table("Votes", votes_fields()).await?;
    let options = setup.create_table("Options", options_fields(votes)).await?;
    let responses = setup.create_table("Responses", responses_fields(votes)).await?;
    println!("VOTES_TABLE_ID={}", votes);
    println!("OPTIONS_TABLE_ID={}", options);
    println!("RESPONSES_TABLE_ID={}", responses);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_field_body() {
        let f = field("count", "number", json!({ "number_decimal_places": 0 }));
        assert_eq!(f.body, json!({ "name": "count", "type": "number", "number_decimal_places": 0 }));
    }

    #[test]
    fn test_link_rows_point_at_votes() {
        for fields in [options_fields(42), responses_fields(42)] {
            assert_eq!(fields[0].name, "vote");
            assert_eq!(fields[0].body["link_row_table_id"], 42);
        }
    }

    #[test]
    fn test_votes_field_names() {
        let names: Vec<&str> = votes_fields().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["question", "max_selections", "created_at", "uuid"]);
    }

    #[tokio::test]
    async fn test_create_table_removes_example_rows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/database/tables/database/9/"))
            .and(header("Authorization", "JWT jwt"))
            .and(body_json(json!({ "name": "Votes" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 5, "name": "Votes" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/database/rows/table/5/"))
            .and(query_param("size", "200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "next": null,
                "results": [{ "id": 1, "Name": null }, { "id": 2, "Name": null }],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/database/rows/table/5/batch-delete/"))
            .and(body_json(json!({ "items": [1, 2] })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/database/fields/table/5/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 100 })))
            .expect(4)
            .mount(&server)
            .await;

        let setup = Setup {
            client: Client::new(),
            config: SetupConfig {
                url: server.uri(),
                database_id: 9,
                jwt: "jwt".into(),
            },
        };
        assert_eq!(setup.create_table("Votes", votes_fields()).await.unwrap(), 5);
    }
}
