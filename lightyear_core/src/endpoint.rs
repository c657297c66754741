use crate::oracle::{Oracle, StatusCodeOracle};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Default per-request deadline for [`HttpEndpoint`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What happened to a single submitted candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The endpoint accepted the credentials.
    Success,
    /// The endpoint refused the credentials with the given status.
    Rejected(u16),
    /// The endpoint does not exist. Fatal for the run.
    NotFound,
    /// The request could not be completed.
    TransportError(String),
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Success => write!(f, "success"),
            AttemptOutcome::Rejected(status) => write!(f, "rejected ({status})"),
            AttemptOutcome::NotFound => write!(f, "not found"),
            AttemptOutcome::TransportError(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

/// Submits one login attempt and reports its outcome.
///
/// Calls block until the attempt is resolved; any request-level deadline is
/// the implementation's responsibility.
pub trait Endpoint {
    fn submit(&mut self, username: &str, candidate: &str) -> AttemptOutcome;
}

/// An endpoint backed by a closure returning a status code, classified by an
/// [`Oracle`]. Useful for harnesses and tests that need no network.
pub struct InProcessEndpoint<F>
where
    F: FnMut(&str, &str) -> u16,
{
    responder: F,
    oracle: Box<dyn Oracle>,
}

impl<F> InProcessEndpoint<F>
where
    F: FnMut(&str, &str) -> u16,
{
    pub fn new(responder: F) -> Self {
        Self::with_oracle(responder, Box::new(StatusCodeOracle::default()))
    }

    pub fn with_oracle(responder: F, oracle: Box<dyn Oracle>) -> Self {
        Self { responder, oracle }
    }
}

impl<F> Endpoint for InProcessEndpoint<F>
where
    F: FnMut(&str, &str) -> u16,
{
    fn submit(&mut self, username: &str, candidate: &str) -> AttemptOutcome {
        let status = (self.responder)(username, candidate);
        self.oracle.classify(status)
    }
}

#[derive(Debug, Clone)]
pub struct HttpEndpointConfig {
    pub url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl HttpEndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: concat!("lightyear/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    username: &'a str,
    password: &'a str,
}

/// POSTs `{"username": .., "password": ..}` as JSON to a login URL.
///
/// One client (and its connection pool) is reused for every attempt.
pub struct HttpEndpoint {
    client: reqwest::blocking::Client,
    url: String,
    oracle: Box<dyn Oracle>,
}

impl HttpEndpoint {
    pub fn new(config: HttpEndpointConfig) -> Result<Self, reqwest::Error> {
        Self::with_oracle(config, Box::new(StatusCodeOracle::default()))
    }

    pub fn with_oracle(
        config: HttpEndpointConfig,
        oracle: Box<dyn Oracle>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self {
            client,
            url: config.url,
            oracle,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Endpoint for HttpEndpoint {
    fn submit(&mut self, username: &str, candidate: &str) -> AttemptOutcome {
        let payload = LoginPayload {
            username,
            password: candidate,
        };
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(e) => {
                return AttemptOutcome::TransportError(format!(
                    "Failed to encode login payload: {e}"
                ));
            }
        };

        match self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
        {
            Ok(response) => self.oracle.classify(response.status().as_u16()),
            Err(e) => {
                log::warn!("Request to {} failed: {e}", self.url);
                AttemptOutcome::TransportError(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn endpoint_for(url: String) -> HttpEndpoint {
        let mut config = HttpEndpointConfig::new(url);
        config.timeout = Duration::from_secs(5);
        HttpEndpoint::new(config).expect("client should build")
    }

    #[test]
    fn in_process_endpoint_classifies_responder_status() {
        let mut calls = Vec::new();
        let mut endpoint = InProcessEndpoint::new(|user: &str, pw: &str| {
            calls.push(format!("{user}:{pw}"));
            if pw == "open" { 200 } else { 401 }
        });
        assert_eq!(endpoint.submit("al", "open"), AttemptOutcome::Success);
        assert_eq!(endpoint.submit("al", "shut"), AttemptOutcome::Rejected(401));
        drop(endpoint);
        assert_eq!(calls, vec!["al:open", "al:shut"]);
    }

    #[test]
    fn in_process_endpoint_uses_custom_oracle() {
        let oracle = StatusCodeOracle::new(vec![302], vec![410]);
        let mut endpoint = InProcessEndpoint::with_oracle(|_: &str, _: &str| 410, Box::new(oracle));
        assert_eq!(endpoint.submit("al", "x"), AttemptOutcome::NotFound);
    }

    #[test]
    fn http_endpoint_posts_json_credentials() {
        let mut server = mockito::Server::new();
        let login = server
            .mock("POST", "/login")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "username": "al",
                "password": "Passw0rd1!"
            })))
            .with_status(200)
            .with_body(r#"{"message":"Login successful!"}"#)
            .create();

        let mut endpoint = endpoint_for(format!("{}/login", server.url()));
        assert_eq!(endpoint.submit("al", "Passw0rd1!"), AttemptOutcome::Success);
        login.assert();
    }

    #[test]
    fn http_endpoint_maps_other_statuses_to_rejection() {
        let mut server = mockito::Server::new();
        let login = server
            .mock("POST", "/login")
            .with_status(401)
            .with_body(r#"{"message":"Invalid credentials."}"#)
            .expect(2)
            .create();

        let mut endpoint = endpoint_for(format!("{}/login", server.url()));
        for guess in ["guess1", "guess2"] {
            let outcome = endpoint.submit("al", guess);
            assert_eq!(outcome, AttemptOutcome::Rejected(401));
        }
        login.assert();
    }

    #[test]
    fn http_endpoint_maps_404_to_not_found() {
        let mut server = mockito::Server::new();
        let _missing = server.mock("POST", "/nope").with_status(404).create();

        let mut endpoint = endpoint_for(format!("{}/nope", server.url()));
        assert_eq!(endpoint.submit("al", "guess"), AttemptOutcome::NotFound);
    }

    #[test]
    fn http_endpoint_reports_connection_failure_as_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut endpoint = endpoint_for(format!("http://{addr}/login"));
        assert!(matches!(
            endpoint.submit("al", "guess"),
            AttemptOutcome::TransportError(_)
        ));
    }
}
