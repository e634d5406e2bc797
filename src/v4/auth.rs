/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v4::api::{check_status, default_user_agent};
use crate::v4::config::{ClientConfig, Configuration, Credentials, GrantType};
use crate::v4::errors::BynderError;
use crate::v4::oauth1;
use crate::v4::pkce::{CODE_CHALLENGE_METHOD, generate_code_challenge, generate_code_verifier};
use crate::v4::token::{AccessToken, TokenPair, TokenResponse};
use chrono::Utc;
use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, RequestBuilder};
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use url::Url;

pub const AUTHORIZE_PATH: &str = "v6/authentication/oauth2/auth";
pub const TOKEN_PATH: &str = "v6/authentication/oauth2/token";

/// Strategy used to authenticate every outbound request.
///
/// Selected once from the configuration type the client was built with.
pub enum Authenticator {
    OAuth2(OAuth2Session),
    PermanentToken(String),
    Legacy(RwLock<Credentials>),
}

impl Authenticator {
    pub(crate) fn new(config: ClientConfig, origin: String, http_client: reqwest::Client) -> Self {
        match config {
            ClientConfig::OAuth2(config) => Authenticator::OAuth2(OAuth2Session {
                timeout: config.request_options().timeout,
                config: RwLock::new(config),
                code_verifier: Mutex::new(None),
                origin,
                http_client,
            }),
            ClientConfig::PermanentToken(config) => {
                Authenticator::PermanentToken(config.token().to_string())
            }
            ClientConfig::Legacy(config) => {
                let (_, credentials, _) = config.into_parts();
                Authenticator::Legacy(RwLock::new(credentials))
            }
        }
    }

    /// Signs the request, refreshing an expired OAuth2 token first
    pub async fn authenticate(
        &self,
        builder: RequestBuilder,
        method: &Method,
        url: &Url,
        form: &[(String, String)],
    ) -> Result<RequestBuilder, BynderError> {
        match self {
            Authenticator::OAuth2(session) => {
                let token = session.valid_token().await?;
                Ok(builder.bearer_auth(token.access_token))
            }
            Authenticator::PermanentToken(token) => Ok(builder.bearer_auth(token)),
            Authenticator::Legacy(credentials) => {
                let header = {
                    let creds = read_lock(credentials)?;
                    oauth1::authorization_header(&creds, method.as_str(), url, form)?
                };
                Ok(builder.header(AUTHORIZATION, header))
            }
        }
    }

    pub fn oauth2(&self) -> Result<&OAuth2Session, BynderError> {
        match self {
            Authenticator::OAuth2(session) => Ok(session),
            _ => Err(BynderError::InvalidConfiguration(
                "Operation requires an OAuth2 configuration".to_string(),
            )),
        }
    }

    pub fn legacy(&self) -> Result<&RwLock<Credentials>, BynderError> {
        match self {
            Authenticator::Legacy(credentials) => Ok(credentials),
            _ => Err(BynderError::InvalidConfiguration(
                "Operation requires a legacy consumer key configuration".to_string(),
            )),
        }
    }

    /// Replaces the legacy token/secret used for signing
    pub fn set_token_pair(&self, pair: TokenPair) -> Result<(), BynderError> {
        write_lock(self.legacy()?)?.set_token_pair(pair);
        Ok(())
    }

    /// Restores the initial credentials. Static tokens have nothing to restore.
    pub fn reset_credentials(&self) -> Result<(), BynderError> {
        match self {
            Authenticator::OAuth2(session) => {
                write_lock(&session.config)?.reset_credentials();
                *lock(&session.code_verifier)? = None;
            }
            Authenticator::PermanentToken(_) => (),
            Authenticator::Legacy(credentials) => write_lock(credentials)?.reset_credentials(),
        }
        Ok(())
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Authenticator::OAuth2(_) => "OAuth2",
            Authenticator::PermanentToken(_) => "PermanentToken",
            Authenticator::Legacy(_) => "Legacy",
        };
        f.write_str(name)
    }
}

/// OAuth2 state shared by every request of one client
pub struct OAuth2Session {
    config: RwLock<Configuration>,
    code_verifier: Mutex<Option<String>>,
    origin: String,
    http_client: reqwest::Client,
    timeout: Option<Duration>,
}

impl OAuth2Session {
    pub fn grant_type(&self) -> Result<GrantType, BynderError> {
        Ok(read_lock(&self.config)?.grant_type())
    }

    /// Current token without triggering a refresh
    pub fn token(&self) -> Result<Option<AccessToken>, BynderError> {
        Ok(read_lock(&self.config)?.token().cloned())
    }

    /// Builds the login url carrying a fresh PKCE challenge.
    ///
    /// The matching verifier is kept for the following [`Self::get_access_token`] call.
    pub fn authorization_url(&self, scopes: &[&str], state: Option<&str>) -> Result<Url, BynderError> {
        let (client_id, redirect_uri) = {
            let config = read_lock(&self.config)?;
            if config.grant_type() != GrantType::AuthorizationCode {
                return Err(BynderError::InvalidConfiguration(
                    "Authorization url requires the authorization_code grant".to_string(),
                ));
            }
            (
                config.client_id().to_string(),
                config.redirect_uri().unwrap_or_default().to_string(),
            )
        };

        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);
        let state = match state {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => generate_code_verifier(),
        };
        *lock(&self.code_verifier)? = Some(verifier);

        let scope = scopes.join(" ");
        let params: Vec<(&str, &str)> = vec![
            ("client_id", client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("state", state.as_str()),
            ("scope", scope.as_str()),
            ("response_type", "code"),
            ("code_challenge", challenge.as_str()),
            ("code_challenge_method", CODE_CHALLENGE_METHOD),
        ];
        Ok(Url::parse_with_params(
            &format!("{}/{}", self.origin, AUTHORIZE_PATH),
            &params,
        )?)
    }

    /// Obtains a token with the configured grant and stores it in the session.
    ///
    /// The authorization code grant requires a non empty `code`; the client credentials grant
    /// ignores it.
    pub async fn get_access_token(&self, code: Option<&str>) -> Result<AccessToken, BynderError> {
        let token = match self.grant_type()? {
            GrantType::AuthorizationCode => {
                let code = code.filter(|c| !c.is_empty()).ok_or_else(|| {
                    BynderError::InvalidArgument(
                        "'code' cannot be empty or null when using authorization_code grant type"
                            .to_string(),
                    )
                })?;
                let redirect_uri = read_lock(&self.config)?
                    .redirect_uri()
                    .unwrap_or_default()
                    .to_string();
                let mut params = vec![
                    ("grant_type".to_string(), "authorization_code".to_string()),
                    ("code".to_string(), code.to_string()),
                    ("redirect_uri".to_string(), redirect_uri),
                ];
                if let Some(verifier) = lock(&self.code_verifier)?.clone() {
                    params.push(("code_verifier".to_string(), verifier));
                }
                self.exchange(params, None).await?
            }
            GrantType::ClientCredentials => self.client_credentials().await?,
        };
        write_lock(&self.config)?.set_token(Some(token.clone()));
        Ok(token)
    }

    /// Exchanges the stored refresh token for a new access token
    pub async fn refresh_access_token(&self) -> Result<AccessToken, BynderError> {
        let current = self.token()?.ok_or_else(|| {
            BynderError::Auth("No access token available to refresh".to_string())
        })?;
        self.refresh(current).await
    }

    // Token valid for the next request, refreshing it when it reports itself expired
    pub(crate) async fn valid_token(&self) -> Result<AccessToken, BynderError> {
        match self.token()? {
            Some(token) if token.has_expired() => self.refresh(token).await,
            Some(token) => Ok(token),
            None if self.grant_type()? == GrantType::ClientCredentials => {
                self.get_access_token(None).await
            }
            None => Err(BynderError::Auth(
                "No access token. Complete the authorization code flow first".to_string(),
            )),
        }
    }

    async fn refresh(&self, current: AccessToken) -> Result<AccessToken, BynderError> {
        let token = match current.refresh_token.clone() {
            Some(refresh_token) => {
                warn!("Access token expired, refreshing");
                self.exchange(
                    vec![
                        ("grant_type".to_string(), "refresh_token".to_string()),
                        ("refresh_token".to_string(), refresh_token.clone()),
                    ],
                    Some(refresh_token),
                )
                .await?
            }
            None if self.grant_type()? == GrantType::ClientCredentials => {
                warn!("Access token expired, requesting a new client credentials token");
                self.client_credentials().await?
            }
            None => {
                return Err(BynderError::Auth(
                    "Access token expired and no refresh token is available".to_string(),
                ));
            }
        };
        write_lock(&self.config)?.set_token(Some(token.clone()));
        Ok(token)
    }

    async fn client_credentials(&self) -> Result<AccessToken, BynderError> {
        self.exchange(
            vec![("grant_type".to_string(), "client_credentials".to_string())],
            None,
        )
        .await
    }

    // POST v6/authentication/oauth2/token
    async fn exchange(
        &self,
        params: Vec<(String, String)>,
        previous_refresh_token: Option<String>,
    ) -> Result<AccessToken, BynderError> {
        let (client_id, client_secret) = {
            let config = read_lock(&self.config)?;
            (
                config.client_id().to_string(),
                config.client_secret().to_string(),
            )
        };
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &client_id)
            .append_pair("client_secret", &client_secret)
            .extend_pairs(params.iter())
            .finish();

        let url = Url::parse(&format!("{}/{}", self.origin, TOKEN_PATH))?;
        debug!("POST {}", url.path());
        let mut builder = self
            .http_client
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(USER_AGENT, default_user_agent())
            .body(body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let issued_at = Utc::now();
        let resp = check_status(builder.send().await?).await?;
        let body = resp.bytes().await?;
        let token: TokenResponse = serde_json::from_slice(&body)?;
        token.into_access_token(issued_at, previous_refresh_token)
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> Result<std::sync::RwLockReadGuard<'_, T>, BynderError> {
    lock.read()
        .map_err(|_| BynderError::Auth("Credential store is poisoned".to_string()))
}

fn write_lock<T>(lock: &RwLock<T>) -> Result<std::sync::RwLockWriteGuard<'_, T>, BynderError> {
    lock.write()
        .map_err(|_| BynderError::Auth("Credential store is poisoned".to_string()))
}

fn lock<T>(lock: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, BynderError> {
    lock.lock()
        .map_err(|_| BynderError::Auth("Credential store is poisoned".to_string()))
}
