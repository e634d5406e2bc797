/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

//! HMAC-SHA1 request signing used by the legacy consumer key/secret flow.

use crate::v4::config::Credentials;
use crate::v4::errors::BynderError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// Builds the `Authorization: OAuth ...` header value for a request.
///
/// `form_params` must contain the url-encoded form body parameters, if any, since they take
/// part in the signature.
pub(crate) fn authorization_header(
    creds: &Credentials,
    method: &str,
    url: &Url,
    form_params: &[(String, String)],
) -> Result<String, BynderError> {
    let nonce = hex::encode(rand::random::<[u8; 16]>());
    let timestamp = chrono::Utc::now().timestamp().to_string();
    authorization_header_with(creds, method, url, form_params, &nonce, &timestamp)
}

pub(crate) fn authorization_header_with(
    creds: &Credentials,
    method: &str,
    url: &Url,
    form_params: &[(String, String)],
    nonce: &str,
    timestamp: &str,
) -> Result<String, BynderError> {
    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), creds.consumer_key().into()),
        ("oauth_nonce".into(), nonce.into()),
        ("oauth_signature_method".into(), SIGNATURE_METHOD.into()),
        ("oauth_timestamp".into(), timestamp.into()),
        ("oauth_version".into(), OAUTH_VERSION.into()),
    ];
    if let Some(token) = creds.token() {
        oauth_params.push(("oauth_token".into(), token.into()));
    }

    let mut all_params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    all_params.extend(form_params.iter().cloned());
    all_params.extend(oauth_params.iter().cloned());

    let base = signature_base_string(method, url, &all_params);
    let signature = sign(
        creds.consumer_secret(),
        creds.token_secret().unwrap_or(""),
        &base,
    )?;
    oauth_params.push(("oauth_signature".into(), signature));

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {}", fields))
}

// METHOD&encoded(base url)&encoded(sorted params)
pub(crate) fn signature_base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let base_url = format!("{}{}", url.origin().ascii_serialization(), url.path());

    let mut encoded: Vec<(String, String)> =
        params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    encoded.sort();
    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(&base_url),
        encode(&normalized)
    )
}

fn sign(consumer_secret: &str, token_secret: &str, base: &str) -> Result<String, BynderError> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| BynderError::Auth(format!("Invalid signing key: {}", e)))?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn encode(v: &str) -> String {
    urlencoding::encode(v).into_owned()
}
