/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v4::errors::BynderError;
use crate::v4::parsers::from_expires_in;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth2 access token as issued by the Bynder token endpoint.
///
/// Tokens are immutable values. A refresh produces a new `AccessToken` which replaces the
/// old one in the session.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessToken {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl AccessToken {
    /// Token without refresh or expiry information
    pub fn new(access_token: &str) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            token_type: None,
            scope: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: &str) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// A token without an expiry never reports itself expired
    pub fn has_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"xxx")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "xxx"))
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

// Body returned by v6/authentication/oauth2/token
#[derive(Deserialize, Debug)]
pub(crate) struct TokenResponse {
    access_token: String,

    #[serde(default)]
    refresh_token: Option<String>,

    #[serde(default, deserialize_with = "from_expires_in")]
    expires_in: Option<i64>,

    #[serde(default)]
    token_type: Option<String>,

    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    /// Converts the wire response into a token, anchoring `expires_in` at `issued_at`.
    ///
    /// A refresh response that omits the refresh token keeps the previous one. An
    /// `expires_in` that cannot be represented as a timestamp is rejected.
    pub(crate) fn into_access_token(
        self,
        issued_at: DateTime<Utc>,
        previous_refresh_token: Option<String>,
    ) -> Result<AccessToken, BynderError> {
        let expires_at = match self.expires_in {
            Some(secs) => Some(
                Duration::try_seconds(secs)
                    .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        BynderError::Auth(format!("Token expires_in out of range: {}", secs))
                    })?,
            ),
            None => None,
        };
        Ok(AccessToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh_token),
            expires_at,
            token_type: self.token_type,
            scope: self.scope,
        })
    }
}

/// Token/secret pair used by the legacy request signing
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: String,
    pub secret: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &"xxx")
            .field("secret", &"xxx")
            .finish()
    }
}
