/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v4::api::check_status;
use crate::v4::chunks::Chunk;
use crate::v4::errors::BynderError;
use crate::v4::parsers::from_string_or_number;
use log::debug;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Upload authorization returned by `api/upload/init`
#[derive(Deserialize, Debug, Clone)]
pub struct UploadInit {
    pub s3file: S3File,
    pub s3_filename: String,
    pub multipart_params: Map<String, Value>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct S3File {
    #[serde(rename = "uploadid", deserialize_with = "from_string_or_number")]
    pub upload_id: String,
    #[serde(rename = "targetid", deserialize_with = "from_string_or_number")]
    pub target_id: String,
}

impl UploadInit {
    /// Object key of a part, `{key}/p{n}`
    pub fn part_key(&self, sequence_number: u32) -> Result<String, BynderError> {
        let key = self
            .multipart_params
            .get("key")
            .and_then(Value::as_str)
            .ok_or(BynderError::ResponseMissing())?;
        Ok(format!("{}/p{}", key, sequence_number))
    }

    /// Uploaded file name of a part as Bynder expects it, `{s3_filename}/p{n}`
    pub fn part_filename(&self, sequence_number: u64) -> String {
        format!("{}/p{}", self.s3_filename, sequence_number)
    }
}

/// Posts file parts straight to the storage endpoint handed out by Bynder.
///
/// These requests carry the pre-signed policy from [`UploadInit`] and are never authenticated
/// against the Bynder API.
#[derive(Debug, Clone)]
pub struct AmazonApi {
    http_client: reqwest::Client,
}

impl AmazonApi {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    pub async fn upload_part(
        &self,
        endpoint: &str,
        init: &UploadInit,
        file_name: &str,
        chunk: &Chunk,
        chunk_count: u64,
    ) -> Result<(), BynderError> {
        let key = init.part_key(chunk.sequence_number)?;
        debug!("Uploading part {} to {}", key, endpoint);

        let mut form = Form::new();
        for (name, value) in init.multipart_params.iter() {
            if name == "key" {
                continue;
            }
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(name.clone(), value);
        }
        // The file part must come last for the storage policy check
        let form = form
            .text("key", key.clone())
            .text("name", file_name.to_string())
            .text("chunk", chunk.sequence_number.to_string())
            .text("chunks", chunk_count.to_string())
            .text("Filename", key)
            .text("content-sha256", chunk.sha256.clone())
            .part(
                "file",
                Part::bytes(chunk.data.to_vec()).file_name(file_name.to_string()),
            );

        let resp = self
            .http_client
            .post(endpoint)
            .multipart(form)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
