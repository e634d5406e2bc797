/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v4::auth::Authenticator;
use crate::v4::config::{ClientConfig, RequestOptions, origin_from_domain};
use crate::v4::errors::BynderError;
use bytes::Bytes;
use log::debug;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, Response};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Name sent in the User-Agent header
pub const SDK_NAME: &str = "bynder-rust-sdk";

/// Default User-Agent identifying this library and its version
pub fn default_user_agent() -> String {
    format!("{}/{}", SDK_NAME, env!("CARGO_PKG_VERSION"))
}

/// Free form query/form parameters
pub type ApiParams<'a> = [(&'a str, &'a str)];

pub(crate) fn owned_params(params: Option<&ApiParams<'_>>) -> Vec<(String, String)> {
    params
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Per request options. Merged with the client's [`RequestOptions`] when sent.
#[derive(Debug, Default)]
pub struct SendOptions {
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
    /// Skip authentication entirely
    pub unsigned: bool,
    /// Return 3xx responses instead of following them
    pub no_redirects: bool,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, params: Vec<(String, String)>) -> Self {
        self.query.extend(params);
        self
    }

    pub fn with_query_param(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_form(mut self, params: Vec<(String, String)>) -> Self {
        self.form.extend(params);
        self
    }

    pub fn with_form_param(mut self, name: &str, value: &str) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response decoded according to its declared content type
#[derive(Debug)]
pub enum ApiResponse {
    /// `application/json`
    Json(Value),
    /// `text/plain`
    Text(String),
    /// `text/html`, returned untouched for redirect style flows
    Html(Response),
}

impl ApiResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiResponse::Json(v) => Some(v),
            _ => None,
        }
    }

    /// JSON payload of the response. Plain text is returned as a JSON string.
    pub fn into_json(self) -> Result<Value, BynderError> {
        match self {
            ApiResponse::Json(v) => Ok(v),
            ApiResponse::Text(s) => Ok(Value::String(s)),
            ApiResponse::Html(_) => Err(BynderError::ResponseMissing()),
        }
    }

    pub fn into_text(self) -> Result<String, BynderError> {
        match self {
            ApiResponse::Text(s) => Ok(s),
            ApiResponse::Json(v) => Ok(v.to_string()),
            ApiResponse::Html(_) => Err(BynderError::ResponseMissing()),
        }
    }
}

/// Directly communicates with the API.
///
/// Composes `https://{domain}/{path}`, lets the configured [`Authenticator`] sign the request
/// and decodes the response by content type.
pub struct ApiClient {
    origin: String,
    auth: Authenticator,
    https_client: reqwest::Client,
    no_redirect_client: reqwest::Client,
    request_options: RequestOptions,
}

impl ApiClient {
    /// Validates the configuration and selects the auth strategy for its lifetime
    pub fn new(config: ClientConfig) -> Result<Self, BynderError> {
        config.validate()?;
        let origin = origin_from_domain(config.domain());
        let request_options = config.request_options().clone();
        let https_client = reqwest::Client::new();
        let no_redirect_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let auth = Authenticator::new(config, origin.clone(), https_client.clone());
        Ok(Self {
            origin,
            auth,
            https_client,
            no_redirect_client,
            request_options,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn auth(&self) -> &Authenticator {
        &self.auth
    }

    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.https_client
    }

    pub(crate) fn request_options(&self) -> &RequestOptions {
        &self.request_options
    }

    /// Validates the method and composes the absolute request url
    pub fn form_request(&self, method: &Method, path: &str) -> Result<Url, BynderError> {
        if ![Method::GET, Method::POST, Method::DELETE].contains(method) {
            return Err(BynderError::InvalidRequestMethod(method.to_string()));
        }
        Ok(Url::parse(&format!(
            "{}/{}",
            self.origin,
            path.trim_start_matches('/')
        ))?)
    }

    /// Sends an authenticated request and decodes the response
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        options: SendOptions,
    ) -> Result<ApiResponse, BynderError> {
        let resp = self.send_raw(method, path, options).await?;
        decode_response(resp).await
    }

    /// Sends an authenticated request returning the response as is.
    ///
    /// 4xx and 5xx statuses are still turned into errors.
    pub async fn send_raw(
        &self,
        method: Method,
        path: &str,
        options: SendOptions,
    ) -> Result<Response, BynderError> {
        let mut url = self.form_request(&method, path)?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(options.query.iter());
        }
        debug!("{} {}", method, url.path());

        let client = if options.no_redirects {
            &self.no_redirect_client
        } else {
            &self.https_client
        };
        let mut builder = client.request(method.clone(), url.clone());

        if let Some(timeout) = options.timeout.or(self.request_options.timeout) {
            builder = builder.timeout(timeout);
        }

        for (name, value) in self.merge_headers(&options) {
            builder = builder.header(name, value);
        }

        if !options.form.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(options.form.iter())
                .finish();
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encoded);
        } else if let Some(body) = options.body {
            builder = builder.body(body);
        }

        if !options.unsigned {
            builder = self
                .auth
                .authenticate(builder, &method, &url, &options.form)
                .await?;
        }

        let resp = builder.send().await?;
        check_status(resp).await
    }

    // Client defaults, overridden by the per request headers
    fn merge_headers(&self, options: &SendOptions) -> Vec<(String, String)> {
        let mut merged: Vec<(String, String)> = Vec::new();
        for (name, value) in self
            .request_options
            .headers
            .iter()
            .chain(options.headers.iter())
        {
            if !options.unsigned && name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                continue;
            }
            merged.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
            merged.push((name.clone(), value.clone()));
        }
        if !merged
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(USER_AGENT.as_str()))
        {
            let agent = self
                .request_options
                .user_agent
                .clone()
                .unwrap_or_else(default_user_agent);
            merged.push((USER_AGENT.as_str().to_string(), agent));
        }
        merged
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("origin", &self.origin)
            .field("auth", &self.auth)
            .finish()
    }
}

/// Turns 4xx/5xx statuses into errors carrying the response body
pub(crate) async fn check_status(resp: Response) -> Result<Response, BynderError> {
    let status = resp.status();
    if status.is_client_error() {
        let body = error_body(resp).await;
        return Err(BynderError::ClientError {
            status: status.as_u16(),
            body,
        });
    }
    if status.is_server_error() {
        let body = error_body(resp).await;
        return Err(BynderError::ServerError {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

async fn error_body(resp: Response) -> String {
    let status = resp.status();
    resp.text().await.unwrap_or_else(|err| {
        debug!("Could not read {} response body: {}", status, err);
        String::new()
    })
}

/// Decodes a response by its `Content-Type`
pub async fn decode_response(resp: Response) -> Result<ApiResponse, BynderError> {
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(mime_type)
        .unwrap_or_default();
    match content_type.as_str() {
        "application/json" => {
            let body = resp.bytes().await?;
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(ApiResponse::Json(Value::Null));
            }
            Ok(ApiResponse::Json(serde_json::from_slice(&body)?))
        }
        "text/plain" => Ok(ApiResponse::Text(resp.text().await?)),
        "text/html" => Ok(ApiResponse::Html(resp)),
        other => Err(BynderError::UnrecognizedResponseType(other.to_string())),
    }
}

// "application/json; charset=utf-8" -> "application/json"
fn mime_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
