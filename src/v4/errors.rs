/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

use std::io;
use strum_macros::{Display, IntoStaticStr};
use thiserror::Error;

/// Error conditions that can be returned
#[derive(Error, Debug)]
pub enum BynderError {
    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("Request network error")]
    Request(#[from] reqwest::Error),

    #[error("Deserialization error")]
    Deserialization(#[from] serde_json::Error),

    #[error("URL Parse error")]
    UrlParsing(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid request method provided: {0}")]
    InvalidRequestMethod(String),

    #[error("The response type not recognized: {0}")]
    UnrecognizedResponseType(String),

    #[error("API rejected the request with status {status}: {body}")]
    ClientError { status: u16, body: String },

    #[error("API failed to process the request with status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Authorization error. {0}")]
    Auth(String),

    #[error("Unable to upload file. {0}")]
    UploadValidation(String),

    #[error("Upload failed during {stage} stage")]
    UploadStep {
        stage: UploadStage,
        #[source]
        source: Box<BynderError>,
    },

    #[error("Media conversion failed for import: {0}")]
    ConversionFailed(String),

    #[error("Expected response missing")]
    ResponseMissing(),
}

impl BynderError {
    pub(crate) fn upload_step(stage: UploadStage, source: BynderError) -> Self {
        BynderError::UploadStep {
            stage,
            source: Box::new(source),
        }
    }

    /// Error that failed the underlying call, looking through upload stage wrappers
    pub fn root(&self) -> &BynderError {
        match self {
            BynderError::UploadStep { source, .. } => source.root(),
            other => other,
        }
    }

    /// HTTP status returned by the API, when the failure was an upstream rejection or fault
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            BynderError::ClientError { status, .. } | BynderError::ServerError { status, .. } => {
                Some(*status)
            }
            BynderError::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for 4xx responses
    pub fn is_client_error(&self) -> bool {
        matches!(self.root(), BynderError::ClientError { .. })
    }

    /// True for 5xx responses
    pub fn is_server_error(&self) -> bool {
        matches!(self.root(), BynderError::ServerError { .. })
    }

    /// True when the request never produced an HTTP response (connect, timeout, TLS...)
    pub fn is_transport_error(&self) -> bool {
        matches!(self.root(), BynderError::Request(_))
    }
}

/// Stages of the upload pipeline, used to tag which step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum UploadStage {
    ResolveEndpoint,
    Prepare,
    Chunks,
    Finalize,
    Poll,
    Save,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_looks_through_upload_stage() {
        let err = BynderError::upload_step(
            UploadStage::Save,
            BynderError::ServerError {
                status: 503,
                body: "unavailable".into(),
            },
        );
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
        assert!(!err.is_transport_error());
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "Upload failed during save stage");
    }

    #[test]
    fn client_errors_are_not_server_errors() {
        let err = BynderError::ClientError {
            status: 404,
            body: String::new(),
        };
        assert!(err.is_client_error());
        assert_eq!(err.status(), Some(404));
        assert_eq!(BynderError::ResponseMissing().status(), None);
    }
}
