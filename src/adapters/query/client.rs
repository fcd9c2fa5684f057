//! Asynchronous submit/poll client for the remote event store
//!
//! Queries are submitted with a POST; an immediately-SUCCEEDED response is
//! returned directly, otherwise the returned request token is polled on a
//! fixed interval up to a bounded attempt count. SUCCEEDED is the only
//! successful terminal state; anything else, or an exhausted poll budget,
//! fails the query with the last observed state.

use super::auth::TokenProvider;
use super::models::{EventPage, QueryResponse};
use crate::config::QueryConfig;
use crate::domain::{Integration, QueryError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;

const EXECUTE_PATH: &str = "/platform/storage/query/v1/query:execute";
const POLL_PATH: &str = "/platform/storage/query/v1/query:poll";

/// Fixed delay between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Result-size caps sent with every submit.
const MAX_RESULT_BYTES: u64 = 100_000_000;
const MAX_RESULT_RECORDS: u64 = 100_000;

/// Event bucket every query is scoped to.
const EVENT_BUCKET: &str = "bizevents";

/// Read access to the remote event store, scoped per integration and
/// time range. The pager drives this seam; tests swap in fakes.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Number of records for the integration in `[from, to)`.
    async fn count(
        &self,
        integration: &Integration,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64>;

    /// One bounded page of records for the integration in `[from, to)`,
    /// ascending by timestamp.
    async fn fetch(
        &self,
        integration: &Integration,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page_size: usize,
    ) -> Result<EventPage>;
}

/// Production [`EventStore`] speaking the submit/poll protocol.
pub struct QueryClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenProvider>,
    max_polls: u32,
    request_timeout: Duration,
}

impl QueryClient {
    pub fn new(config: &QueryConfig, tokens: Arc<TokenProvider>) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.apps.dynatrace.com", config.tenant));

        Self {
            http: reqwest::Client::new(),
            base_url,
            tokens,
            max_polls: config.max_polls,
            request_timeout: Duration::from_millis(config.request_timeout_millis),
        }
    }

    fn build_count_query(
        integration: &Integration,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> String {
        format!(
            "{} | summarize count = count()",
            Self::build_filter(integration, from, to)
        )
    }

    fn build_fetch_query(
        integration: &Integration,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page_size: usize,
    ) -> String {
        format!(
            "{} | limit {page_size} | sort timestamp asc",
            Self::build_filter(integration, from, to)
        )
    }

    fn build_filter(integration: &Integration, from: DateTime<Utc>, to: DateTime<Utc>) -> String {
        format!(
            "fetch {EVENT_BUCKET}, bucket:{{\"{EVENT_BUCKET}\"}}, \
             from: toTimestamp(\"{}\"), to: toTimestamp(\"{}\") \
             | filter source == \"{}\" AND destination == \"{}\"",
            from.to_rfc3339_opts(SecondsFormat::Millis, true),
            to.to_rfc3339_opts(SecondsFormat::Millis, true),
            integration.source().to_lowercase(),
            integration.destination().to_lowercase(),
        )
    }

    /// Submit a query and poll it to completion.
    async fn execute_with_polling(&self, query: &str) -> Result<QueryResponse> {
        let token = self.tokens.access_token().await?;

        let submitted = self.submit(query, &token).await?;
        if submitted.is_succeeded() {
            return Ok(submitted);
        }

        let request_token = submitted.request_token.clone().ok_or_else(|| {
            QueryError::MissingToken {
                state: submitted.state.clone(),
            }
        })?;

        let mut last = submitted;
        let mut attempts = 0;
        while attempts < self.max_polls && last.is_running() {
            tokio::time::sleep(POLL_INTERVAL).await;
            last = self.poll(&request_token, &token).await?;
            attempts += 1;
        }

        if !last.is_succeeded() {
            return Err(QueryError::Failed { state: last.state }.into());
        }

        Ok(last)
    }

    async fn submit(&self, query: &str, token: &str) -> Result<QueryResponse> {
        tracing::debug!(query = %query, "Submitting query");

        let body = serde_json::json!({
            "query": query,
            "maxResultBytes": MAX_RESULT_BYTES,
            "maxResultRecords": MAX_RESULT_RECORDS,
        });

        let response = self
            .http
            .post(format!("{}{EXECUTE_PATH}", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| QueryError::Transport(format!("submit failed: {e}")))?;

        Self::read_response(response).await
    }

    async fn poll(&self, request_token: &str, token: &str) -> Result<QueryResponse> {
        tracing::debug!(request_token = %request_token, "Polling query");

        let response = self
            .http
            .get(format!("{}{POLL_PATH}", self.base_url))
            .query(&[("request-token", request_token)])
            .bearer_auth(token)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| QueryError::Transport(format!("poll failed: {e}")))?;

        Self::read_response(response).await
    }

    async fn read_response(response: reqwest::Response) -> Result<QueryResponse> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Http {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed = response
            .json::<QueryResponse>()
            .await
            .map_err(|e| QueryError::InvalidResponse(e.to_string()))?;
        Ok(parsed)
    }

    fn result_payload(response: QueryResponse) -> Result<super::models::QueryResultPayload> {
        response.result.ok_or_else(|| {
            QueryError::InvalidResponse("query SUCCEEDED but result was missing".to_string())
                .into()
        })
    }
}

#[async_trait]
impl EventStore for QueryClient {
    async fn count(
        &self,
        integration: &Integration,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let query = Self::build_count_query(integration, from, to);
        let response = self.execute_with_polling(&query).await?;
        let payload = Self::result_payload(response)?;

        let count = payload
            .records
            .first()
            .and_then(|record| record.get("count"))
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| {
                QueryError::InvalidResponse(
                    "count result did not contain records[0].count".to_string(),
                )
            })?;

        tracing::debug!(
            integration_id = %integration.id(),
            %from,
            %to,
            count,
            "Counted events"
        );
        Ok(count)
    }

    async fn fetch(
        &self,
        integration: &Integration,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page_size: usize,
    ) -> Result<EventPage> {
        let query = Self::build_fetch_query(integration, from, to, page_size);
        let response = self.execute_with_polling(&query).await?;
        let payload = Self::result_payload(response)?;

        let page = EventPage::from_records(payload.records);
        if !page.is_empty() && page.next_cursor.is_none() {
            tracing::warn!(
                integration_id = %integration.id(),
                records = page.len(),
                "Fetched page without a usable trailing timestamp; pagination will stop"
            );
        }

        tracing::debug!(
            integration_id = %integration.id(),
            %from,
            %to,
            records = page.len(),
            next_cursor = ?page.next_cursor,
            "Fetched event page"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_count_query_text() {
        let integration = Integration::new("IC-01", "INT03-1", "INT04");
        let (from, to) = window_bounds();
        let query = QueryClient::build_count_query(&integration, from, to);

        assert!(query.starts_with("fetch bizevents, bucket:{\"bizevents\"}"));
        assert!(query.contains("from: toTimestamp(\"2025-03-14T09:00:00.000Z\")"));
        assert!(query.contains("to: toTimestamp(\"2025-03-14T10:00:00.000Z\")"));
        assert!(query.contains("filter source == \"int03-1\" AND destination == \"int04\""));
        assert!(query.ends_with("| summarize count = count()"));
    }

    #[test]
    fn test_fetch_query_text() {
        let integration = Integration::new("IC-07", "INT08-1", "N/A");
        let (from, to) = window_bounds();
        let query = QueryClient::build_fetch_query(&integration, from, to, 1000);

        // raw destination spelling, lowercased
        assert!(query.contains("destination == \"n/a\""));
        assert!(query.ends_with("| limit 1000 | sort timestamp asc"));
    }

    #[test]
    fn test_base_url_derived_from_tenant() {
        let config = QueryConfig {
            tenant: "acme01".to_string(),
            base_url: None,
            page_size: 1000,
            max_polls: 3,
            request_timeout_millis: 1000,
        };
        let tokens = Arc::new(TokenProvider::new(crate::config::OAuthConfig {
            token_url: "https://sso.example.com/token".to_string(),
            client_id: "c".to_string(),
            client_secret: crate::config::secret_from("s"),
            scope: String::new(),
            resource_urn: "urn:example".to_string(),
        }));
        let client = QueryClient::new(&config, tokens);
        assert_eq!(client.base_url, "https://acme01.apps.dynatrace.com");
    }
}
