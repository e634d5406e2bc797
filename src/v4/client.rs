/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v4::api::{ApiClient, ApiParams, ApiResponse, SendOptions, owned_params};
use crate::v4::asset_bank::AssetBankManager;
use crate::v4::config::ClientConfig;
use crate::v4::errors::BynderError;
use crate::v4::token::{AccessToken, TokenPair};
use crate::v4::upload::UploadSettings;
use log::info;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Entry point for the Bynder API.
///
/// The authentication strategy is picked from the configuration type and fixed for the lifetime
/// of the client. Clones share the same session.
///
/// ```rust,no_run
/// use bynder::v4::{Client, PermanentTokenConfiguration, RequestOptions};
///
/// # async fn brands() -> Result<(), bynder::v4::BynderError> {
/// let client = Client::new(PermanentTokenConfiguration::new(
///     "portal.bynder.com",
///     "permanent-token",
///     RequestOptions::default(),
/// ))?;
/// let brands = client.asset_bank_manager().get_brands().await?;
/// println!("{}", brands);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    api_client: Arc<ApiClient>,
    asset_bank_manager: Arc<AssetBankManager>,
}

impl Client {
    pub fn new(config: impl Into<ClientConfig>) -> Result<Self, BynderError> {
        Self::with_upload_settings(config, UploadSettings::default())
    }

    pub fn with_upload_settings(
        config: impl Into<ClientConfig>,
        upload_settings: UploadSettings,
    ) -> Result<Self, BynderError> {
        let api_client = Arc::new(ApiClient::new(config.into())?);
        let asset_bank_manager = Arc::new(AssetBankManager::new(
            api_client.clone(),
            upload_settings,
        ));
        Ok(Self {
            api_client,
            asset_bank_manager,
        })
    }

    /// Lower level interface for sending requests directly
    pub fn api_client(&self) -> &ApiClient {
        &self.api_client
    }

    pub fn asset_bank_manager(&self) -> &AssetBankManager {
        &self.asset_bank_manager
    }

    /// Login url for the OAuth2 authorization code flow
    pub fn get_authorization_url(
        &self,
        scopes: &[&str],
        state: Option<&str>,
    ) -> Result<Url, BynderError> {
        self.api_client.auth().oauth2()?.authorization_url(scopes, state)
    }

    /// Obtains an OAuth2 access token. `code` is only used by the authorization code grant.
    pub async fn get_access_token(&self, code: Option<&str>) -> Result<AccessToken, BynderError> {
        self.api_client.auth().oauth2()?.get_access_token(code).await
    }

    pub async fn refresh_access_token(&self) -> Result<AccessToken, BynderError> {
        self.api_client.auth().oauth2()?.refresh_access_token().await
    }

    /// OAuth2 token currently held by the session
    pub fn access_token(&self) -> Result<Option<AccessToken>, BynderError> {
        self.api_client.auth().oauth2()?.token()
    }

    /// First leg of the legacy flow. The request token is used to sign the following calls.
    pub async fn get_request_token(&self) -> Result<TokenPair, BynderError> {
        self.api_client.auth().legacy()?;
        let resp = self
            .api_client
            .send(
                Method::POST,
                "api/v4/oauth/request_token/",
                SendOptions::new(),
            )
            .await?;
        let pair = token_pair(resp, "oauth_token", "oauth_token_secret")?;
        self.api_client.auth().set_token_pair(pair.clone())?;
        Ok(pair)
    }

    /// Sends the user authorization step of the legacy flow.
    ///
    /// Redirects are returned as is so the caller can forward the user.
    pub async fn authorise_request_token(
        &self,
        query: &ApiParams<'_>,
    ) -> Result<reqwest::Response, BynderError> {
        let mut options = SendOptions::new().with_query(owned_params(Some(query)));
        options.unsigned = true;
        options.no_redirects = true;
        self.api_client
            .send_raw(Method::GET, "api/v4/oauth/authorise/", options)
            .await
    }

    /// Exchanges the authorized request token for an access token and keeps it for signing
    pub async fn exchange_request_token(&self) -> Result<TokenPair, BynderError> {
        self.api_client.auth().legacy()?;
        let resp = self
            .api_client
            .send(
                Method::POST,
                "api/v4/oauth/access_token/",
                SendOptions::new(),
            )
            .await?;
        let pair = token_pair(resp, "oauth_token", "oauth_token_secret")?;
        self.api_client.auth().set_token_pair(pair.clone())?;
        Ok(pair)
    }

    /// Uses an already obtained legacy token/secret for signing
    pub fn set_access_token_credentials(&self, token: &str, secret: &str) -> Result<(), BynderError> {
        self.api_client.auth().set_token_pair(TokenPair {
            token: token.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Logs in with username and password and keeps the returned token for signing
    #[deprecated(note = "Use the OAuth2 flows instead")]
    pub async fn user_login(&self, username: &str, password: &str) -> Result<TokenPair, BynderError> {
        self.api_client.auth().legacy()?;
        let resp = self
            .api_client
            .send(
                Method::POST,
                "api/v4/users/login/",
                SendOptions::new()
                    .with_form_param("username", username)
                    .with_form_param("password", password),
            )
            .await?;
        let pair = token_pair(resp, "tokenKey", "tokenSecret")?;
        self.api_client.auth().set_token_pair(pair.clone())?;
        Ok(pair)
    }

    /// Restores the credentials the client was created with
    pub fn logout(&self) -> Result<(), BynderError> {
        info!("Resetting credentials");
        self.api_client.auth().reset_credentials()
    }

    pub async fn get_users(&self, include_inactive: bool) -> Result<Value, BynderError> {
        let inactive = if include_inactive { "1" } else { "0" };
        self.get(
            "api/v4/users/",
            SendOptions::new().with_query_param("includeInActive", inactive),
        )
        .await
    }

    pub async fn get_user(
        &self,
        user_id: &str,
        query: Option<&ApiParams<'_>>,
    ) -> Result<Value, BynderError> {
        self.get(
            &format!("api/v4/users/{}", user_id),
            SendOptions::new().with_query(owned_params(query)),
        )
        .await
    }

    pub async fn get_current_user(&self) -> Result<Value, BynderError> {
        self.get("api/v4/currentUser/", SendOptions::new()).await
    }

    pub async fn get_security_profile(&self, profile_id: &str) -> Result<Value, BynderError> {
        self.get(&format!("api/v4/profiles/{}", profile_id), SendOptions::new())
            .await
    }

    async fn get(&self, path: &str, options: SendOptions) -> Result<Value, BynderError> {
        self.api_client
            .send(Method::GET, path, options)
            .await?
            .into_json()
    }
}

// Token responses come back either form encoded as text or as JSON
fn token_pair(resp: ApiResponse, token_key: &str, secret_key: &str) -> Result<TokenPair, BynderError> {
    let (token, secret) = match resp {
        ApiResponse::Json(value) => (
            value.get(token_key).and_then(Value::as_str).map(str::to_string),
            value.get(secret_key).and_then(Value::as_str).map(str::to_string),
        ),
        ApiResponse::Text(text) => {
            let mut token = None;
            let mut secret = None;
            for (k, v) in url::form_urlencoded::parse(text.trim().as_bytes()) {
                if k == token_key {
                    token = Some(v.into_owned());
                } else if k == secret_key {
                    secret = Some(v.into_owned());
                }
            }
            (token, secret)
        }
        ApiResponse::Html(_) => (None, None),
    };
    match (token, secret) {
        (Some(token), Some(secret)) => Ok(TokenPair { token, secret }),
        _ => Err(BynderError::Auth(format!(
            "Response did not contain {} and {}",
            token_key, secret_key
        ))),
    }
}
