//! Hosted store client (PostgREST dialect)
//!
//! `select` maps to `GET /rest/v1/<table>?col=eq.val&offset=&limit=`,
//! `upsert` to a `POST` with `Prefer: resolution=merge-duplicates` and
//! `on_conflict=`, `delete` to `DELETE` with the same filter syntax.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, RequestBuilder,
};
use serde_json::Value;

use super::{is_identifier, schema::table_spec, EntityStore, Filter, Page, Row};
use crate::error::{Result, SyncError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, service_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(service_key)?;
        key.set_sensitive(true);
        headers.insert("apikey", key);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {service_key}"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .user_agent(concat!("football-sync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> Result<String> {
        table_spec(table)?;
        Ok(format!("{}/rest/v1/{}", self.base_url, table))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let res = builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                SyncError::StoreUnreachable {
                    message: e.to_string(),
                }
            } else {
                SyncError::Http(e)
            }
        })?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        Err(SyncError::Store {
            message: format!("{}: {}", status.as_u16(), body),
        })
    }
}

/// PostgREST query pairs for an equality filter.
fn filter_params(filter: &Filter) -> Result<Vec<(String, String)>> {
    filter
        .eq
        .iter()
        .map(|(column, value)| {
            if !is_identifier(column) {
                return Err(SyncError::Store {
                    message: format!("invalid column name: {column}"),
                });
            }
            let op = match value {
                Value::Null => "is.null".to_string(),
                Value::Bool(b) => format!("is.{b}"),
                Value::String(s) => format!("eq.{s}"),
                other => format!("eq.{other}"),
            };
            Ok((column.clone(), op))
        })
        .collect()
}

impl EntityStore for RestStore {
    async fn select(&self, table: &str, filter: &Filter, page: Page) -> Result<Vec<Row>> {
        let url = self.table_url(table)?;
        let order = table_spec(table)?
            .conflict_key
            .iter()
            .map(|c| format!("{c}.asc"))
            .collect::<Vec<_>>()
            .join(",");

        let mut query = filter_params(filter)?;
        query.push(("select".to_string(), "*".to_string()));
        query.push(("order".to_string(), order));
        query.push(("offset".to_string(), page.offset.to_string()));
        query.push(("limit".to_string(), page.limit.to_string()));

        let res = self.send(self.client.get(&url).query(&query)).await?;
        Ok(res.json::<Vec<Row>>().await?)
    }

    async fn upsert(&self, table: &str, rows: &[Row], conflict_key: &[&str]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let url = self.table_url(table)?;
        let builder = self
            .client
            .post(&url)
            .query(&[("on_conflict", conflict_key.join(","))])
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows);
        self.send(builder).await?;
        Ok(rows.len())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize> {
        if filter.is_empty() {
            return Err(SyncError::Store {
                message: format!("refusing unfiltered delete on {table}"),
            });
        }
        let url = self.table_url(table)?;
        let builder = self
            .client
            .delete(&url)
            .query(&filter_params(filter)?)
            .header("Prefer", "return=representation");
        let removed = self.send(builder).await?.json::<Vec<Value>>().await?;
        Ok(removed.len())
    }

    async fn ping(&self) -> Result<()> {
        let url = self.table_url(super::schema::TEAMS)?;
        self.send(self.client.get(&url).query(&[("select", "id"), ("limit", "1")]))
            .await
            .map(|_| ())
            .map_err(|e| SyncError::StoreUnreachable {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header, header_exists, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    #[test]
    fn test_filter_params() {
        let filter = Filter::all()
            .eq("team_id", 33)
            .eq("name", "Arsenal")
            .eq("coach", Value::Null)
            .eq("national", true);
        let params = filter_params(&filter).unwrap();
        assert_eq!(
            params,
            vec![
                ("team_id".to_string(), "eq.33".to_string()),
                ("name".to_string(), "eq.Arsenal".to_string()),
                ("coach".to_string(), "is.null".to_string()),
                ("national".to_string(), "is.true".to_string()),
            ]
        );
    }

    #[test]
    fn test_filter_rejects_bad_column() {
        let filter = Filter::all().eq("id;drop", 1);
        assert!(filter_params(&filter).is_err());
    }

    #[tokio::test]
    async fn test_select_sends_page_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/teams"))
            .and(query_param("country", "eq.England"))
            .and(query_param("offset", "100"))
            .and(query_param("limit", "50"))
            .and(query_param("order", "id.asc"))
            .and(header("apikey", "svc"))
            .and(header("authorization", "Bearer svc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": 33, "name": "Man Utd"}])),
            )
            .mount(&server)
            .await;

        let store = RestStore::new(server.uri(), "svc").unwrap();
        let rows = store
            .select(
                "teams",
                &Filter::all().eq("country", "England"),
                Page {
                    offset: 100,
                    limit: 50,
                },
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Man Utd");
    }

    #[tokio::test]
    async fn test_upsert_uses_conflict_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/squads"))
            .and(query_param("on_conflict", "team_id,season"))
            .and(header_exists("prefer"))
            .and(body_json(json!([{"team_id": 33, "season": 2024, "players": []}])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = RestStore::new(server.uri(), "svc").unwrap();
        let row = json!({"team_id": 33, "season": 2024, "players": []})
            .as_object()
            .cloned()
            .unwrap();
        let written = store
            .upsert("squads", &[row], &["team_id", "season"])
            .await
            .unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn test_store_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/teams"))
            .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
            .mount(&server)
            .await;

        let store = RestStore::new(server.uri(), "svc").unwrap();
        let row = json!({"id": 1}).as_object().cloned().unwrap();
        match store.upsert("teams", &[row], &["id"]).await {
            Err(SyncError::Store { message }) => assert!(message.starts_with("409")),
            other => panic!("Expected Store error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ping_failure_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/teams"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let store = RestStore::new(server.uri(), "bad").unwrap();
        assert!(matches!(
            store.ping().await,
            Err(SyncError::StoreUnreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_table_rejected_before_request() {
        let store = RestStore::new("http://127.0.0.1:9", "svc").unwrap();
        assert!(matches!(
            store.select("fixtures", &Filter::all(), Page::first(10)).await,
            Err(SyncError::UnknownTable { .. })
        ));
    }
}
