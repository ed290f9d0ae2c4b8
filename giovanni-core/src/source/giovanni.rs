use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderName, HeaderValue},
};
use tracing::{debug, info};

use crate::{
    config::{ApiToken, Config},
    error::FetchError,
    model::{TimeseriesQuery, TimeseriesResponse},
};

use super::TimeseriesSource;

/// Header Giovanni reads the Earthdata token from.
pub const AUTH_HEADER: &str = "authorizationtoken";

#[derive(Debug, Clone)]
pub struct GiovanniClient {
    token: ApiToken,
    endpoint: String,
    http: Client,
}

impl GiovanniClient {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(config.settings.timeout())
            .build()
            .map_err(FetchError::ClientBuild)?;

        Self::with_http(config.token.clone(), config.settings.endpoint.clone(), http)
    }

    /// Use a caller-built HTTP client, e.g. one with custom proxy rules.
    pub fn with_http(token: ApiToken, endpoint: String, http: Client) -> Result<Self, FetchError> {
        // Reject tokens that can't be sent before any request is attempted.
        auth_header(&token)?;
        Ok(Self { token, endpoint, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// The `authorizationtoken` header for `token`, value forwarded verbatim.
pub fn auth_header(token: &ApiToken) -> Result<(HeaderName, HeaderValue), FetchError> {
    let mut value = HeaderValue::from_str(token.as_str()).map_err(|_| {
        FetchError::Configuration(
            "EARTHDATA_API_TOKEN contains characters that are not valid in an HTTP header"
                .to_string(),
        )
    })?;
    value.set_sensitive(true);

    Ok((HeaderName::from_static(AUTH_HEADER), value))
}

#[async_trait]
impl TimeseriesSource for GiovanniClient {
    async fn fetch(&self, query: &TimeseriesQuery) -> Result<TimeseriesResponse, FetchError> {
        let (name, value) = auth_header(&self.token)?;

        debug!(endpoint = %self.endpoint, query = %query.query_string(), "sending timeseries request");

        let res = self
            .http
            .get(&self.endpoint)
            .header(name, value)
            .query(&query.query_pairs())
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = res.status();
        let body = res.text().await.map_err(FetchError::Network)?;

        info!(%status, bytes = body.len(), "received timeseries response");

        Ok(TimeseriesResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use reqwest::StatusCode;
    use std::{error::Error as _, time::Duration};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    fn token(raw: &str) -> ApiToken {
        ApiToken::new(raw).unwrap()
    }

    fn local_client(endpoint: String, timeout: Duration) -> GiovanniClient {
        let http = Client::builder().no_proxy().timeout(timeout).build().unwrap();
        GiovanniClient::with_http(token("abc123"), endpoint, http).unwrap()
    }

    /// Accept one connection, answer it, and hand back the raw request head.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            String::from_utf8(request).unwrap()
        });

        (format!("http://{addr}/timeseries"), handle)
    }

    #[test]
    fn auth_header_is_exact() {
        let (name, value) = auth_header(&token("abc123")).unwrap();
        assert_eq!(name.as_str(), "authorizationtoken");
        assert_eq!(value.to_str().unwrap(), "abc123");
        assert!(value.is_sensitive());
    }

    #[test]
    fn token_with_newline_is_rejected_up_front() {
        let http = Client::new();
        let err = GiovanniClient::with_http(token("abc\n123"), "http://localhost".into(), http)
            .unwrap_err();
        assert!(matches!(err, FetchError::Configuration(_)));
    }

    #[test]
    fn new_uses_configured_endpoint() {
        let config = Config {
            token: token("abc123"),
            settings: Settings {
                endpoint: "http://127.0.0.1:9/timeseries".into(),
                ..Settings::default()
            },
        };
        let client = GiovanniClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/timeseries");
    }

    #[tokio::test]
    async fn sends_header_and_encoded_query() {
        let (endpoint, server) = serve_once("200 OK", r#"{"message":null}"#).await;
        let client = local_client(endpoint, Duration::from_secs(5));
        let query = TimeseriesQuery::mica_dam_precipitation().unwrap();

        let res = client.fetch(&query).await.unwrap();
        let request = server.await.unwrap();

        assert!(
            request.starts_with(
                "GET /timeseries?data=GPM_3IMERGDL_06_precipitationCal\
                 &location=%5B52.076%2C118.566%5D\
                 &time=2022-01-01T00%3A00%3A00Z%2F2022-01-02T00%3A00%3A00Z HTTP/1.1\r\n"
            ),
            "unexpected request line: {request}"
        );
        assert!(request.to_lowercase().contains("\r\nauthorizationtoken: abc123\r\n"));

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, r#"{"message":null}"#);
    }

    #[tokio::test]
    async fn error_status_is_returned_not_raised() {
        let (endpoint, server) = serve_once("401 Unauthorized", r#"{"message":"Unauthorized"}"#).await;
        let client = local_client(endpoint, Duration::from_secs(5));
        let query = TimeseriesQuery::mica_dam_precipitation().unwrap();

        let res = client.fetch(&query).await.unwrap();
        server.await.unwrap();

        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body, r#"{"message":"Unauthorized"}"#);
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = local_client(format!("http://{addr}/timeseries"), Duration::from_secs(5));
        let query = TimeseriesQuery::mica_dam_precipitation().unwrap();

        let err = client.fetch(&query).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });

        let client = local_client(format!("http://{addr}/timeseries"), Duration::from_millis(200));
        let query = TimeseriesQuery::mica_dam_precipitation().unwrap();

        let err = client.fetch(&query).await.unwrap_err();
        match err {
            FetchError::Network(source) => assert!(source.is_timeout(), "{:?}", source.source()),
            other => panic!("expected network error, got {other:?}"),
        }
        server.abort();
    }
}
