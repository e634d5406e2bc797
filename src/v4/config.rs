/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v4::errors::BynderError;
use crate::v4::token::{AccessToken, TokenPair};
use std::str::FromStr;
use std::time::Duration;
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Default options applied to every request sent by a client.
///
/// Headers given per request take precedence over these on conflicts.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
    pub user_agent: Option<String>,
}

impl RequestOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// OAuth2 grant used to obtain the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum GrantType {
    #[strum(serialize = "authorization_code")]
    AuthorizationCode,
    #[strum(serialize = "client_credentials")]
    ClientCredentials,
}

/// Settings for the OAuth2 flows.
///
/// Without a redirect URI the client credentials grant is used, otherwise the authorization
/// code grant with PKCE.
#[derive(Clone)]
pub struct Configuration {
    domain: String,
    redirect_uri: Option<String>,
    client_id: String,
    client_secret: String,
    token: Option<AccessToken>,
    initial_token: Option<AccessToken>,
    request_options: RequestOptions,
    grant_type: Option<GrantType>,
}

impl Configuration {
    pub fn new(
        domain: &str,
        redirect_uri: Option<&str>,
        client_id: &str,
        client_secret: &str,
        token: Option<AccessToken>,
        request_options: RequestOptions,
    ) -> Self {
        Self {
            domain: domain.into(),
            redirect_uri: redirect_uri.map(Into::into),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            initial_token: token.clone(),
            token,
            request_options,
            grant_type: None,
        }
    }

    /// Forces a grant type instead of deriving it from the redirect URI
    pub fn with_grant_type(mut self, grant_type: &str) -> Result<Self, BynderError> {
        let grant = GrantType::from_str(grant_type).map_err(|_| {
            BynderError::InvalidArgument(format!(
                "Grant type '{}' is unsupported. Use 'authorization_code' or 'client_credentials'",
                grant_type
            ))
        })?;
        self.grant_type = Some(grant);
        Ok(self)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Redirect URI, `None` when unset or blank
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    pub fn set_token(&mut self, token: Option<AccessToken>) {
        self.token = token;
    }

    /// Restores the token the configuration was created with
    pub fn reset_credentials(&mut self) {
        self.token = self.initial_token.clone();
    }

    pub fn request_options(&self) -> &RequestOptions {
        &self.request_options
    }

    pub fn grant_type(&self) -> GrantType {
        self.grant_type.unwrap_or(match self.redirect_uri() {
            Some(_) => GrantType::AuthorizationCode,
            None => GrantType::ClientCredentials,
        })
    }

    pub(crate) fn validate(&self) -> Result<(), BynderError> {
        require("domain", &self.domain)?;
        require("client id", &self.client_id)?;
        require("client secret", &self.client_secret)?;
        if self.grant_type() == GrantType::AuthorizationCode && self.redirect_uri().is_none() {
            return Err(BynderError::InvalidConfiguration(
                "redirect uri is required for the authorization_code grant".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("domain", &self.domain)
            .field("redirect_uri", &self.redirect_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"xxx")
            .field("token", &self.token)
            .field("grant_type", &self.grant_type())
            .finish()
    }
}

/// Settings for a static (permanent) bearer token
#[derive(Clone)]
pub struct PermanentTokenConfiguration {
    domain: String,
    token: String,
    request_options: RequestOptions,
}

impl PermanentTokenConfiguration {
    pub fn new(domain: &str, token: &str, request_options: RequestOptions) -> Self {
        Self {
            domain: domain.into(),
            token: token.into(),
            request_options,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn request_options(&self) -> &RequestOptions {
        &self.request_options
    }

    pub(crate) fn validate(&self) -> Result<(), BynderError> {
        require("domain", &self.domain)?;
        require("permanent token", &self.token)
    }
}

impl std::fmt::Debug for PermanentTokenConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermanentTokenConfiguration")
            .field("domain", &self.domain)
            .field("token", &"xxx")
            .finish()
    }
}

/// Consumer and access tokens for the legacy signed requests
#[derive(Default, Clone)]
pub struct Credentials {
    consumer_key: String,
    consumer_secret: String,
    token: Option<String>,
    token_secret: Option<String>,
    initial_token: Option<String>,
    initial_secret: Option<String>,
}

impl Credentials {
    pub fn new(
        consumer_key: &str,
        consumer_secret: &str,
        token: Option<&str>,
        token_secret: Option<&str>,
    ) -> Self {
        let token: Option<String> = token.map(Into::into);
        let token_secret: Option<String> = token_secret.map(Into::into);
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            initial_token: token.clone(),
            initial_secret: token_secret.clone(),
            token,
            token_secret,
        }
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    pub fn consumer_secret(&self) -> &str {
        &self.consumer_secret
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn token_secret(&self) -> Option<&str> {
        self.token_secret.as_deref()
    }

    pub fn set_token_pair(&mut self, pair: TokenPair) {
        self.token = Some(pair.token);
        self.token_secret = Some(pair.secret);
    }

    /// Restores the token and secret the credentials were created with
    pub fn reset_credentials(&mut self) {
        self.token = self.initial_token.clone();
        self.token_secret = self.initial_secret.clone();
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &"xxx")
            .field("consumer_secret", &"xxx")
            .field("token", &self.token.as_ref().map(|_| "xxx"))
            .field("token_secret", &self.token_secret.as_ref().map(|_| "xxx"))
            .finish()
    }
}

/// Settings for the legacy signed request flow
#[derive(Debug, Clone)]
pub struct LegacyConfiguration {
    domain: String,
    credentials: Credentials,
    request_options: RequestOptions,
}

impl LegacyConfiguration {
    pub fn new(domain: &str, credentials: Credentials, request_options: RequestOptions) -> Self {
        Self {
            domain: domain.into(),
            credentials,
            request_options,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn request_options(&self) -> &RequestOptions {
        &self.request_options
    }

    pub(crate) fn into_parts(self) -> (String, Credentials, RequestOptions) {
        (self.domain, self.credentials, self.request_options)
    }

    pub(crate) fn validate(&self) -> Result<(), BynderError> {
        require("domain", &self.domain)?;
        require("consumer key", &self.credentials.consumer_key)?;
        require("consumer secret", &self.credentials.consumer_secret)
    }
}

/// Any of the supported configurations. The variant decides the auth strategy.
#[derive(Debug, Clone)]
pub enum ClientConfig {
    OAuth2(Configuration),
    PermanentToken(PermanentTokenConfiguration),
    Legacy(LegacyConfiguration),
}

impl ClientConfig {
    pub fn domain(&self) -> &str {
        match self {
            ClientConfig::OAuth2(c) => c.domain(),
            ClientConfig::PermanentToken(c) => c.domain(),
            ClientConfig::Legacy(c) => c.domain(),
        }
    }

    pub fn request_options(&self) -> &RequestOptions {
        match self {
            ClientConfig::OAuth2(c) => c.request_options(),
            ClientConfig::PermanentToken(c) => c.request_options(),
            ClientConfig::Legacy(c) => c.request_options(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), BynderError> {
        match self {
            ClientConfig::OAuth2(c) => c.validate(),
            ClientConfig::PermanentToken(c) => c.validate(),
            ClientConfig::Legacy(c) => c.validate(),
        }
    }
}

impl From<Configuration> for ClientConfig {
    fn from(value: Configuration) -> Self {
        ClientConfig::OAuth2(value)
    }
}

impl From<PermanentTokenConfiguration> for ClientConfig {
    fn from(value: PermanentTokenConfiguration) -> Self {
        ClientConfig::PermanentToken(value)
    }
}

impl From<LegacyConfiguration> for ClientConfig {
    fn from(value: LegacyConfiguration) -> Self {
        ClientConfig::Legacy(value)
    }
}

/// Origin used for every request: `https://{domain}` unless the domain already has a scheme
pub(crate) fn origin_from_domain(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

fn require(name: &str, value: &str) -> Result<(), BynderError> {
    if value.trim().is_empty() {
        return Err(BynderError::InvalidConfiguration(format!(
            "{} must not be empty",
            name
        )));
    }
    Ok(())
}
