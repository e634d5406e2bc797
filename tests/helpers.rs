/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use bynder::v4::{
    AccessToken, Client, Configuration, Credentials, LegacyConfiguration,
    PermanentTokenConfiguration, RequestOptions, UploadSettings,
};
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::{MockServer, Request};

#[allow(dead_code)]
pub(crate) const PERMANENT_TOKEN: &str = "permanent-token";

#[allow(dead_code)]
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub(crate) fn permanent_token_client(server: &MockServer) -> Client {
    Client::new(PermanentTokenConfiguration::new(
        &server.uri(),
        PERMANENT_TOKEN,
        RequestOptions::default(),
    ))
    .unwrap()
}

#[allow(dead_code)]
pub(crate) fn upload_client(server: &MockServer, settings: UploadSettings) -> Client {
    Client::with_upload_settings(
        PermanentTokenConfiguration::new(&server.uri(), PERMANENT_TOKEN, RequestOptions::default()),
        settings,
    )
    .unwrap()
}

#[allow(dead_code)]
pub(crate) fn oauth2_client(
    server: &MockServer,
    redirect_uri: Option<&str>,
    token: Option<AccessToken>,
) -> Client {
    Client::new(Configuration::new(
        &server.uri(),
        redirect_uri,
        "client-id",
        "client-secret",
        token,
        RequestOptions::default(),
    ))
    .unwrap()
}

#[allow(dead_code)]
pub(crate) fn legacy_client(server: &MockServer) -> Client {
    Client::new(LegacyConfiguration::new(
        &server.uri(),
        Credentials::new("consumer-key", "consumer-secret", None, None),
        RequestOptions::default(),
    ))
    .unwrap()
}

#[allow(dead_code)]
pub(crate) fn temp_file(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

/// Decoded `application/x-www-form-urlencoded` body of a recorded request
#[allow(dead_code)]
pub(crate) fn form(request: &Request) -> Vec<(String, String)> {
    url::form_urlencoded::parse(&request.body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[allow(dead_code)]
pub(crate) fn form_value(request: &Request, name: &str) -> Option<String> {
    form(request)
        .into_iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v)
}

#[allow(dead_code)]
pub(crate) fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Client for a real portal, configured through the environment
#[allow(dead_code)]
pub(crate) fn get_live_client() -> anyhow::Result<Client> {
    let domain = std::env::var("BYNDER_DOMAIN")?;
    let token = std::env::var("BYNDER_PERMANENT_TOKEN")?;
    Ok(Client::new(PermanentTokenConfiguration::new(
        &domain,
        &token,
        RequestOptions::default(),
    ))?)
}

#[allow(dead_code)]
pub(crate) fn get_live_brand_id() -> anyhow::Result<String> {
    Ok(std::env::var("BYNDER_BRAND_ID")?)
}
