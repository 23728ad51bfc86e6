//! Outbound HTTP: the transport seam and the authenticated client on top of it.

use crate::error::{ClientError, Result};
use crate::session::SessionStore;
use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, starting with '/'
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

/// Any status the server answered with; only transport failures are errors
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Trait for transports to allow mocking and abstraction
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> anyhow::Result<ApiResponse>;
}

pub struct HttpTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> anyhow::Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut req = self
            .agent
            .request(request.method.as_str(), &url)
            .set("Accept", "application/json");
        if let Some(token) = &request.bearer {
            req = req.set("Authorization", &format!("Bearer {}", token));
        }

        let resp = match &request.body {
            Some(body) => req
                .set("Content-Type", "application/json")
                .send_json(body.clone()),
            None => req.call(),
        };

        match resp {
            Ok(r) => Ok(ApiResponse {
                status: r.status(),
                body: r.into_string()?,
            }),
            Err(ureq::Error::Status(code, r)) => Ok(ApiResponse {
                status: code,
                body: r.into_string().unwrap_or_default(),
            }),
            Err(e) => Err(anyhow!("Request failed: {}", e)),
        }
    }
}

/// Whether a call carries the session token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Protected,
}

/// The single outbound path for every component.
///
/// Protected calls take the token from the shared [`SessionStore`]; a 401 or
/// 403 on any of them tears the session down before the error is returned.
pub struct ApiClient {
    transport: Box<dyn Transport>,
    session: Rc<SessionStore>,
}

impl ApiClient {
    pub fn new(transport: Box<dyn Transport>, session: Rc<SessionStore>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Rc<SessionStore> {
        &self.session
    }

    /// Unauthenticated POST used by login and register. 401 and 403 both mean
    /// the identity check failed.
    pub fn post_public<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let body = to_body(body)?;
        let resp = self.execute(Method::Post, path, Some(body), Access::Public)?;
        match resp.status {
            s if (200..300).contains(&s) => decode(path, &resp),
            401 | 403 => Err(ClientError::InvalidCredentials),
            s => Err(ClientError::server(Some(s), error_message(&resp))),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.protected(Method::Get, path, None)?;
        decode(path, &resp)
    }

    pub fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self.protected(Method::Post, path, Some(to_body(body)?))?;
        decode(path, &resp)
    }

    pub fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self.protected(Method::Put, path, Some(to_body(body)?))?;
        decode(path, &resp)
    }

    /// POST whose response body is ignored (`{}` is sent)
    pub fn post_empty(&self, path: &str) -> Result<()> {
        self.protected(Method::Post, path, Some(Value::Object(Default::default())))?;
        Ok(())
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        self.protected(Method::Delete, path, None)?;
        Ok(())
    }

    fn protected(&self, method: Method, path: &str, body: Option<Value>) -> Result<ApiResponse> {
        let resp = self.execute(method, path, body, Access::Protected)?;
        match resp.status {
            s if (200..300).contains(&s) => Ok(resp),
            // Spring Security answers an expired or missing token with 403
            // when no authentication entry point is configured.
            401 | 403 => {
                tracing::info!(path, status = resp.status, "token rejected, clearing session");
                self.session.clear();
                Err(ClientError::Unauthorized)
            }
            404 => Err(ClientError::NotFound(path.to_string())),
            s => Err(ClientError::server(Some(s), error_message(&resp))),
        }
    }

    fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        access: Access,
    ) -> Result<ApiResponse> {
        let bearer = match access {
            Access::Public => None,
            Access::Protected => match self.session.current_token() {
                Some(token) => Some(token),
                None => {
                    tracing::debug!(path, "no session, protected call not sent");
                    return Err(ClientError::Unauthorized);
                }
            },
        };

        let request = ApiRequest {
            method,
            path: path.to_string(),
            bearer,
            body,
        };
        tracing::debug!(method = method.as_str(), path, "sending request");
        let resp = self.transport.send(&request).map_err(|e| {
            tracing::warn!(method = method.as_str(), path, error = %e, "transport failure");
            ClientError::server(None, e.to_string())
        })?;
        tracing::debug!(method = method.as_str(), path, status = resp.status, "response");
        Ok(resp)
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| ClientError::server(None, format!("encoding request: {}", e)))
}

fn decode<T: DeserializeOwned>(path: &str, resp: &ApiResponse) -> Result<T> {
    // Bodiless 2xx (e.g. 204) decodes as JSON null so `()` targets work.
    let body = if resp.body.trim().is_empty() {
        "null"
    } else {
        resp.body.as_str()
    };
    serde_json::from_str(body).map_err(|e| {
        ClientError::server(
            Some(resp.status),
            format!("unexpected response from {}: {}", path, e),
        )
    })
}

/// Pull a human-readable message out of an error body, falling back to the raw text.
fn error_message(resp: &ApiResponse) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(&resp.body) {
        for key in ["message", "error", "detail"] {
            if let Some(msg) = v.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }
    let text = resp.body.trim();
    if text.is_empty() {
        format!("HTTP {}", resp.status)
    } else {
        text.chars().take(200).collect()
    }
}
