//! `reqwest`-backed transport.

use std::env;
use std::time::Duration;

use tracing::{debug, warn};

use crate::{BoxFuture, Transport, TransportError, TransportRequest, TransportResponse};

/// Connection-level settings fixed when the transport is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportConfig {
    /// Prefix for relative request URLs.
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    pub connect_timeout: Option<Duration>,
}

impl TransportConfig {
    /// Reads `APICALL_BASE_URL`, `APICALL_USER_AGENT` and
    /// `APICALL_CONNECT_TIMEOUT_SECS`. Unset or unparsable values are left empty.
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("APICALL_BASE_URL").ok().filter(|v| !v.trim().is_empty()),
            user_agent: env::var("APICALL_USER_AGENT").ok(),
            connect_timeout: env::var("APICALL_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

pub struct HttpTransport {
    config: TransportConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        if let Some(base) = &config.base_url {
            reqwest::Url::parse(base).map_err(|e| TransportError::InvalidUrl {
                url: base.clone(),
                message: e.to_string(),
            })?;
        }

        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder.build().map_err(TransportError::other)?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Absolute `http(s)://` URLs pass through; anything else is appended to
    /// the base URL with exactly one `/` between them.
    fn resolve_url(&self, url: &str) -> Result<reqwest::Url, TransportError> {
        let full = match &self.config.base_url {
            Some(base) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    url.trim_start_matches('/')
                )
            }
            _ => url.to_string(),
        };

        reqwest::Url::parse(&full).map_err(|e| TransportError::InvalidUrl {
            url: full.clone(),
            message: e.to_string(),
        })
    }
}

/// The reason phrase the server sent, falling back to the canonical one.
/// hyper only records the phrase when it differs from the canonical text.
fn reason_phrase(resp: &reqwest::Response) -> String {
    resp.extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).trim().to_string())
        .filter(|reason| !reason.is_empty())
        .or_else(|| resp.status().canonical_reason().map(str::to_owned))
        .unwrap_or_default()
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout { after: timeout }
    } else {
        TransportError::network(err.to_string())
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        Box::pin(async move {
            let url = self.resolve_url(&request.url)?;
            let timeout = request.timeout;

            let mut builder = self
                .client
                .request(request.method.into(), url.clone())
                .timeout(timeout);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            debug!("{} {url}", request.method);
            let resp = builder.send().await.map_err(|e| classify(e, timeout))?;
            let status = resp.status();
            let status_text = reason_phrase(&resp);
            let body = resp.bytes().await.map_err(|e| classify(e, timeout))?;

            if !status.is_success() {
                warn!("{} {url} answered {} {status_text}", request.method, status.as_u16());
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    status_text,
                    body,
                });
            }

            Ok(TransportResponse {
                status: status.as_u16(),
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use hyper::ext::ReasonPhrase;
    use axum::{Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::{HttpTransport, TransportConfig};
    use crate::{Method, Transport, TransportError, TransportRequest};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(TransportConfig::default().with_base_url(base)).unwrap()
    }

    #[tokio::test]
    async fn relative_url_is_joined_onto_base() {
        let router = Router::new().route(
            "/api/items",
            get(|| async { Json(json!({ "result": -1, "data": ["a"] })) }),
        );
        let base = serve(router).await;
        let http = transport(&format!("{base}/api/"));

        let req = TransportRequest::new(Method::Get, "/items", Duration::from_secs(5));
        let resp = http.send(req).await.unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.json_or_text(), json!({ "result": -1, "data": ["a"] }));
    }

    #[tokio::test]
    async fn non_success_status_carries_reason_phrase() {
        let router = Router::new().route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }));
        let base = serve(router).await;

        let req = TransportRequest::new(Method::Get, "teapot", Duration::from_secs(5));
        let err = transport(&base).send(req).await.unwrap_err();

        assert_eq!(err.status_code(), Some(418));
        assert_eq!(err.status_text(), Some("I'm a teapot"));
    }

    #[tokio::test]
    async fn server_reason_phrase_is_kept() {
        let router = Router::new().route(
            "/down",
            get(|| async {
                let mut resp = StatusCode::SERVICE_UNAVAILABLE.into_response();
                resp.extensions_mut()
                    .insert(ReasonPhrase::from_static(b"Down For Maintenance"));
                resp
            }),
        );
        let base = serve(router).await;

        let req = TransportRequest::new(Method::Get, "/down", Duration::from_secs(5));
        let err = transport(&base).send(req).await.unwrap_err();

        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.status_text(), Some("Down For Maintenance"));
        assert_eq!(err.to_string(), "HTTP 503 Down For Maintenance");
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = serve(router).await;

        let req = TransportRequest::new(Method::Get, "/slow", Duration::from_millis(50));
        let err = transport(&base).send(req).await.unwrap_err();

        assert!(matches!(err, TransportError::Timeout { after } if after == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn headers_query_and_body_reach_the_server() {
        let router = Router::new().route(
            "/echo",
            post(
                |headers: HeaderMap,
                 Query(query): Query<HashMap<String, String>>,
                 Json(body): Json<Value>| async move {
                    let trace = headers
                        .get("x-trace")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    Json(json!({ "trace": trace, "page": query.get("page"), "body": body }))
                },
            ),
        );
        let base = serve(router).await;

        let mut req = TransportRequest::new(Method::Post, "/echo", Duration::from_secs(5));
        req.headers.insert("x-trace".to_string(), "t-1".to_string());
        req.query.push(("page".to_string(), "2".to_string()));
        req.body = Some(json!({ "name": "atlas" }));

        let resp = transport(&base).send(req).await.unwrap();
        assert_eq!(
            resp.json_or_text(),
            json!({ "trace": "t-1", "page": "2", "body": { "name": "atlas" } })
        );
    }

    #[tokio::test]
    async fn absolute_url_bypasses_base() {
        let router = Router::new().route("/ping", get(|| async { "pong" }));
        let base = serve(router).await;
        let http = transport("http://127.0.0.1:9/unused");

        let req = TransportRequest::new(Method::Get, format!("{base}/ping"), Duration::from_secs(5));
        let resp = http.send(req).await.unwrap();
        assert_eq!(resp.json_or_text(), json!("pong"));
    }

    #[tokio::test]
    async fn relative_url_without_base_is_invalid() {
        let http = HttpTransport::new(TransportConfig::default()).unwrap();
        let req = TransportRequest::new(Method::Get, "/items", Duration::from_secs(1));
        let err = http.send(req).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        let result = HttpTransport::new(TransportConfig::default().with_base_url("not a url"));
        assert!(matches!(result, Err(TransportError::InvalidUrl { .. })));
    }
}
