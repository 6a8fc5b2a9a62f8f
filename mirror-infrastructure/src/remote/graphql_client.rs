// GraphQL transport for the results service
// Maps HTTP status, Retry-After and GraphQL error payloads onto RemoteError kinds.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use mirror_domain::{Page, QueryKind, RemoteError, RemoteErrorKind, RemoteSource, Variables};

use super::queries::{query_spec, QuerySpec};

const MAX_ERROR_BODY: usize = 512;

pub struct GraphQlRemote {
    client: Client,
    url: String,
    token: String,
}

impl GraphQlRemote {
    /// `timeout` bounds one HTTP exchange; the retry executor adds its own per-attempt deadline.
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tournament-mirror/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            token: token.into(),
        })
    }

    async fn execute(
        &self,
        kind: QueryKind,
        spec: &QuerySpec,
        variables: &Variables,
    ) -> Result<Value, RemoteError> {
        let body = json!({
            "query": spec.document,
            "variables": variables,
        });
        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await.map_err(transport_error)?;
        debug!("{} responded {} ({} bytes)", kind, status, text.len());
        interpret_response(status, retry_after, &text)
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    let kind = if err.is_timeout() {
        RemoteErrorKind::Timeout
    } else {
        RemoteErrorKind::Transport
    };
    RemoteError::new(kind, err.to_string())
}

/// Seconds form only; HTTP-date hints fall back to the configured floor.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    message.to_ascii_lowercase().contains("rate limit")
}

/// Turns one HTTP exchange into the `data` object or a classified error.
pub fn interpret_response(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> Result<Value, RemoteError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(RemoteError::rate_limited(retry_after));
    }
    if !status.is_success() {
        return Err(RemoteError::http(status.as_u16(), retry_after, truncate(body)));
    }

    let payload: Value = serde_json::from_str(body)
        .map_err(|err| RemoteError::malformed(format!("invalid JSON body: {}", err)))?;

    if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let message = errors
                .iter()
                .map(|error| {
                    error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                })
                .collect::<Vec<_>>()
                .join("; ");
            if mentions_rate_limit(&message) {
                return Err(RemoteError::rate_limited(retry_after));
            }
            return Err(RemoteError::new(RemoteErrorKind::GraphQl, message));
        }
    }
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request rejected");
        if mentions_rate_limit(message) {
            return Err(RemoteError::rate_limited(retry_after));
        }
        return Err(RemoteError::new(RemoteErrorKind::GraphQl, message));
    }

    match payload.get("data") {
        Some(data) if !data.is_null() => Ok(data.clone()),
        _ => Err(RemoteError::malformed("response carries no data")),
    }
}

fn descend<'a>(data: &'a Value, root: &[&str]) -> &'a Value {
    root.iter()
        .fold(data, |node, segment| node.get(*segment).unwrap_or(&Value::Null))
}

/// A null anywhere along the root means the remote has nothing for these variables.
pub fn extract_single(data: &Value, root: &[&str]) -> Value {
    descend(data, root).clone()
}

pub fn extract_page(
    data: &Value,
    root: &[&str],
    page: u32,
    per_page: u32,
) -> Result<Page, RemoteError> {
    let connection = descend(data, root);
    if connection.is_null() {
        return Ok(Page::default());
    }
    let nodes = match connection.get("nodes") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(nodes)) => nodes.clone(),
        Some(_) => {
            return Err(RemoteError::malformed(format!(
                "{}.nodes is not a list",
                root.join(".")
            )))
        }
    };
    let total_pages = connection
        .get("pageInfo")
        .and_then(|info| info.get("totalPages"))
        .and_then(Value::as_u64)
        .map(|total| total.min(u64::from(u32::MAX)) as u32);
    let has_more = match total_pages {
        Some(total) => page < total,
        None => nodes.len() as u64 >= u64::from(per_page) && !nodes.is_empty(),
    };
    Ok(Page {
        nodes,
        has_more,
        total_pages,
    })
}

#[async_trait]
impl RemoteSource for GraphQlRemote {
    async fn fetch_page(
        &self,
        kind: QueryKind,
        variables: &Variables,
        page: u32,
        per_page: u32,
    ) -> Result<Page, RemoteError> {
        let spec = query_spec(kind);
        if !spec.paginated {
            return Err(RemoteError::malformed(format!("{} is not paginated", kind)));
        }
        let mut variables = variables.clone();
        variables.insert("page".to_string(), json!(page));
        variables.insert("perPage".to_string(), json!(per_page));
        let data = self.execute(kind, &spec, &variables).await?;
        extract_page(&data, spec.root, page, per_page)
    }

    async fn fetch_one(
        &self,
        kind: QueryKind,
        variables: &Variables,
    ) -> Result<Value, RemoteError> {
        let spec = query_spec(kind);
        if spec.paginated {
            return Err(RemoteError::malformed(format!("{} is paginated", kind)));
        }
        let data = self.execute(kind, &spec, variables).await?;
        Ok(extract_single(&data, spec.root))
    }
}
