use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use shared::constants::{HEADER_API_KEY, REALTIME_VSN, ROOT_REALTIME};
use shared::types::ServiceErrorBody;

use crate::config::ClientConfig;
use crate::error::RemoteError;

/// Base url, project key and a pooled http client, shared by the auth and
/// rest connectors.
#[derive(Clone)]
pub struct SupabaseHttp {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseHttp {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    /// Builds a request for `{base}/{path}`. Without an access token the
    /// project key doubles as bearer, as the service expects for anonymous calls.
    pub fn request(&self, method: Method, path: &str, access_token: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{path}", self.base_url))
            .header(HEADER_API_KEY, &self.anon_key)
            .bearer_auth(access_token.unwrap_or(&self.anon_key))
    }

    /// Websocket endpoint of the realtime service, on the scheme matching the
    /// base url, with the project key in the query.
    pub fn realtime_url(&self) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&format!("{}/{ROOT_REALTIME}", self.base_url))
            .map_err(|err| RemoteError::Rejected(format!("realtime url: {err}")))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| RemoteError::Rejected(format!("realtime url: cannot use {scheme} for {}", self.base_url)))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.anon_key)
            .append_pair("vsn", REALTIME_VSN);
        Ok(url)
    }
}

pub async fn send_json<R>(request: RequestBuilder) -> Result<R, RemoteError>
    where
        R: DeserializeOwned
{
    let resp = check(request.send().await?).await?;
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice::<R>(&body)?)
}

pub async fn send_empty(request: RequestBuilder) -> Result<(), RemoteError> {
    check(request.send().await?).await?;
    Ok(())
}

async fn check(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!("service error {status}: {body}");
    Err(RemoteError::Status {
        status: status.as_u16(),
        message: error_message(&body, status.canonical_reason().unwrap_or("request failed")),
    })
}

fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ServiceErrorBody>(body)
        .ok()
        .and_then(ServiceErrorBody::text)
        .unwrap_or_else(|| fallback.to_string())
}
