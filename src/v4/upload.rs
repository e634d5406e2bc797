/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v4::amazon::{AmazonApi, UploadInit};
use crate::v4::api::{ApiClient, SendOptions, decode_response};
use crate::v4::chunks::{Chunk, chunk_count, read_chunks};
use crate::v4::errors::{BynderError, UploadStage};
use crate::v4::parsers::{from_string_or_number, is_non_empty};
use futures::{StreamExt, pin_mut};
use log::{debug, info, warn};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Default chunk size, 5 MiB
pub const CHUNK_SIZE: usize = 1024 * 1024 * 5;
pub const MAX_POLLING_ITERATIONS: u32 = 60;
pub const POLLING_IDLE_TIME: Duration = Duration::from_millis(2000);

const CORRELATION_ID_HEADER: &str = "X-API-Correlation-ID";
const UPLOAD_INTENT: &str = "upload_main_uploader_asset";

/// Server protocol used to transfer the file bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadProtocol {
    /// Chunks are posted to Bynder itself
    #[default]
    Direct,
    /// Chunks are posted to the storage endpoint and registered with Bynder
    S3Multipart,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub protocol: UploadProtocol,
    pub chunk_size: usize,
    /// Maximum number of storage uploads in flight. Only used by [`UploadProtocol::S3Multipart`].
    pub concurrency: usize,
    pub max_poll_iterations: u32,
    pub poll_delay: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            protocol: UploadProtocol::default(),
            chunk_size: CHUNK_SIZE,
            concurrency: 1,
            max_poll_iterations: MAX_POLLING_ITERATIONS,
            poll_delay: POLLING_IDLE_TIME,
        }
    }
}

impl UploadSettings {
    pub fn with_protocol(mut self, protocol: UploadProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_polling(mut self, max_iterations: u32, delay: Duration) -> Self {
        self.max_poll_iterations = max_iterations;
        self.poll_delay = delay;
        self
    }
}

/// File to upload and the metadata saved with it
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    /// Required unless `media_id` is set
    pub brand_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Existing media to add the file to as a new version
    pub media_id: Option<String>,
    /// Extra save form fields, e.g. `metaproperty.{id}`
    pub fields: Vec<(String, String)>,
}

impl UploadRequest {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    pub fn with_brand_id(mut self, brand_id: &str) -> Self {
        self.brand_id = Some(brand_id.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn with_media_id(mut self, media_id: &str) -> Self {
        self.media_id = Some(media_id.to_string());
        self
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    fn validate(&self) -> Result<(), BynderError> {
        match self.media_id.as_deref().map(str::trim) {
            Some("") => Err(BynderError::UploadValidation(
                "mediaId must not be empty".to_string(),
            )),
            Some(_) => Ok(()),
            None if self.brand_id.as_deref().is_none_or(|b| b.trim().is_empty()) => Err(
                BynderError::UploadValidation("brandId is required for new media".to_string()),
            ),
            None => Ok(()),
        }
    }

    /// Save form. `media_id` only selects the save path and is never part of it.
    pub(crate) fn save_form(&self) -> Vec<(String, String)> {
        let mut form = Vec::new();
        if let Some(brand_id) = &self.brand_id {
            form.push(("brandId".to_string(), brand_id.clone()));
        }
        if let Some(name) = &self.name {
            form.push(("name".to_string(), name.clone()));
        }
        if let Some(description) = &self.description {
            form.push(("description".to_string(), description.clone()));
        }
        if !self.tags.is_empty() {
            form.push(("tags".to_string(), self.tags.join(",")));
        }
        form.extend(
            self.fields
                .iter()
                .filter(|(k, _)| k != "mediaId")
                .cloned(),
        );
        form
    }

    pub(crate) fn save_path(&self, file_id: &str) -> String {
        match &self.media_id {
            Some(media_id) => format!("api/v4/media/{}/save/{}", media_id, file_id),
            None => format!("api/v4/media/save/{}", file_id),
        }
    }

    fn file_name(&self) -> Result<String, BynderError> {
        file_name(&self.file_path)
    }
}

/// Result of a completed upload
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// File id for direct uploads, import id for S3 uploads
    pub file_id: String,
    pub correlation_id: Option<String>,
    /// Decoded response of the save call
    pub media: Value,
}

#[derive(Deserialize)]
struct PrepareResponse {
    #[serde(deserialize_with = "from_string_or_number")]
    file_id: String,
}

#[derive(Debug, PartialEq, Eq)]
enum PollStatus {
    Done,
    Failed,
    Exhausted,
}

/// Drives the chunked upload of a file and saves it as media.
///
/// Every call owns its own session state. The storage endpoint used by the S3 protocol is
/// resolved once and reused for the uploader's lifetime.
#[derive(Debug)]
pub struct FileUploader {
    api_client: Arc<ApiClient>,
    amazon: AmazonApi,
    settings: UploadSettings,
    endpoint: OnceCell<String>,
}

impl FileUploader {
    pub fn new(api_client: Arc<ApiClient>, settings: UploadSettings) -> Self {
        let amazon = AmazonApi::new(api_client.http_client().clone());
        Self {
            api_client,
            amazon,
            settings,
            endpoint: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Uploads the file and saves it, as new media or as a new version of `media_id`
    pub async fn upload_file(&self, request: UploadRequest) -> Result<UploadOutcome, BynderError> {
        request.validate()?;
        let metadata = tokio::fs::metadata(&request.file_path).await.map_err(|e| {
            BynderError::UploadValidation(format!(
                "Cannot read {}: {}",
                request.file_path.display(),
                e
            ))
        })?;
        if !metadata.is_file() {
            return Err(BynderError::UploadValidation(format!(
                "{} is not a file",
                request.file_path.display()
            )));
        }
        if metadata.len() == 0 {
            return Err(BynderError::UploadValidation(format!(
                "{} is empty",
                request.file_path.display()
            )));
        }

        match self.settings.protocol {
            UploadProtocol::Direct => self.upload_direct(&request, metadata.len()).await,
            UploadProtocol::S3Multipart => self.upload_s3(&request, metadata.len()).await,
        }
    }

    async fn upload_direct(
        &self,
        request: &UploadRequest,
        file_size: u64,
    ) -> Result<UploadOutcome, BynderError> {
        let file_name = request.file_name()?;

        info!("Preparing upload of {}", file_name);
        let file_id = self
            .prepare_file()
            .await
            .map_err(|e| BynderError::upload_step(UploadStage::Prepare, e))?;

        info!("Uploading chunks of {} as {}", file_name, file_id);
        let (chunks, sha256) = self
            .upload_chunks_direct(&file_id, &request.file_path)
            .await
            .map_err(|e| BynderError::upload_step(UploadStage::Chunks, e))?;

        info!("Finalizing {} after {} chunks", file_id, chunks);
        let correlation_id = self
            .finalize_file(&file_id, &file_name, file_size, chunks, &sha256)
            .await
            .map_err(|e| BynderError::upload_step(UploadStage::Finalize, e))?;

        let media = self
            .save_media(&file_id, request)
            .await
            .map_err(|e| BynderError::upload_step(UploadStage::Save, e))?;

        Ok(UploadOutcome {
            file_id,
            correlation_id,
            media,
        })
    }

    async fn prepare_file(&self) -> Result<String, BynderError> {
        let resp = self
            .api_client
            .send(Method::POST, "v7/file_cmds/upload/prepare", SendOptions::new())
            .await?
            .into_json()?;
        let prepared: PrepareResponse = serde_json::from_value(resp)?;
        Ok(prepared.file_id)
    }

    // Returns the number of chunks sent and the hex digest of the whole file
    async fn upload_chunks_direct(
        &self,
        file_id: &str,
        path: &Path,
    ) -> Result<(u64, String), BynderError> {
        let chunks = read_chunks(path.to_path_buf(), self.settings.chunk_size);
        pin_mut!(chunks);

        let mut hasher = Sha256::new();
        let mut count = 0;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            hasher.update(&chunk.data);
            debug!("Sending chunk {} of {}", chunk.sequence_number, file_id);
            self.api_client
                .send_raw(
                    Method::POST,
                    &format!(
                        "v7/file_cmds/upload/{}/chunk/{}",
                        file_id, chunk.sequence_number
                    ),
                    SendOptions::new()
                        .with_header("content-sha256", &chunk.sha256)
                        .with_body(chunk.data),
                )
                .await?;
            count += 1;
        }
        Ok((count, hex::encode(hasher.finalize())))
    }

    async fn finalize_file(
        &self,
        file_id: &str,
        file_name: &str,
        file_size: u64,
        chunks: u64,
        sha256: &str,
    ) -> Result<Option<String>, BynderError> {
        let resp = self
            .api_client
            .send_raw(
                Method::POST,
                &format!("v7/file_cmds/upload/{}/finalise_api", file_id),
                SendOptions::new()
                    .with_form_param("fileName", file_name)
                    .with_form_param("fileSize", &file_size.to_string())
                    .with_form_param("chunksCount", &chunks.to_string())
                    .with_form_param("sha256", sha256)
                    .with_form_param("intent", UPLOAD_INTENT),
            )
            .await?;
        Ok(correlation_id(&resp))
    }

    async fn upload_s3(
        &self,
        request: &UploadRequest,
        file_size: u64,
    ) -> Result<UploadOutcome, BynderError> {
        let file_name = request.file_name()?;

        let endpoint = self
            .upload_endpoint()
            .await
            .map_err(|e| BynderError::upload_step(UploadStage::ResolveEndpoint, e))?;

        info!("Requesting upload authorization for {}", file_name);
        let init = self
            .request_upload_information(&file_name)
            .await
            .map_err(|e| BynderError::upload_step(UploadStage::Prepare, e))?;

        let expected = chunk_count(file_size, self.settings.chunk_size);
        info!("Uploading {} chunks of {} to {}", expected, file_name, endpoint);
        let chunks = self
            .upload_chunks_s3(endpoint, &init, &request.file_path, &file_name, expected)
            .await
            .map_err(|e| BynderError::upload_step(UploadStage::Chunks, e))?;

        info!("Finalizing upload {}", init.s3file.upload_id);
        let (import_id, correlation_id) = self
            .finalize_s3(&init, &file_name, chunks)
            .await
            .map_err(|e| BynderError::upload_step(UploadStage::Finalize, e))?;

        let status = self
            .poll_status(&import_id)
            .await
            .map_err(|e| BynderError::upload_step(UploadStage::Poll, e))?;
        match status {
            PollStatus::Done => (),
            PollStatus::Failed => {
                warn!("Conversion of {} failed", import_id);
                return Err(BynderError::ConversionFailed(import_id));
            }
            PollStatus::Exhausted => {
                warn!(
                    "No conversion result for {} after {} polls",
                    import_id, self.settings.max_poll_iterations
                );
                return Err(BynderError::ConversionFailed(import_id));
            }
        }

        let media = self
            .save_media(&import_id, request)
            .await
            .map_err(|e| BynderError::upload_step(UploadStage::Save, e))?;

        Ok(UploadOutcome {
            file_id: import_id,
            correlation_id,
            media,
        })
    }

    /// Storage endpoint closest to the caller, resolved on first use
    pub async fn upload_endpoint(&self) -> Result<&str, BynderError> {
        let endpoint = self
            .endpoint
            .get_or_try_init(|| self.resolve_endpoint())
            .await?;
        Ok(endpoint.as_str())
    }

    async fn resolve_endpoint(&self) -> Result<String, BynderError> {
        let resp = self
            .api_client
            .send(Method::GET, "api/upload/endpoint", SendOptions::new())
            .await?
            .into_json()?;
        match resp {
            Value::String(s) if !s.is_empty() => Ok(s),
            Value::Object(obj) => obj
                .get("endpoint")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(BynderError::ResponseMissing()),
            _ => Err(BynderError::ResponseMissing()),
        }
    }

    async fn request_upload_information(&self, file_name: &str) -> Result<UploadInit, BynderError> {
        let resp = self
            .api_client
            .send(
                Method::POST,
                "api/upload/init",
                SendOptions::new().with_form_param("filename", file_name),
            )
            .await?
            .into_json()?;
        Ok(serde_json::from_value(resp)?)
    }

    // Storage uploads run up to `concurrency` at a time but complete in submission order, and
    // each chunk is registered only after its own upload finished.
    async fn upload_chunks_s3(
        &self,
        endpoint: &str,
        init: &UploadInit,
        path: &Path,
        file_name: &str,
        expected: u64,
    ) -> Result<u64, BynderError> {
        let amazon = &self.amazon;
        let uploads = read_chunks(path.to_path_buf(), self.settings.chunk_size)
            .map(move |chunk| async move {
                let chunk = chunk?;
                amazon
                    .upload_part(endpoint, init, file_name, &chunk, expected)
                    .await?;
                Ok::<Chunk, BynderError>(chunk)
            })
            .buffered(self.settings.concurrency.max(1));
        pin_mut!(uploads);

        let mut registered = 0;
        while let Some(chunk) = uploads.next().await {
            let chunk = chunk?;
            self.register_chunk(init, chunk.sequence_number).await?;
            registered += 1;
        }
        Ok(registered)
    }

    async fn register_chunk(&self, init: &UploadInit, sequence_number: u32) -> Result<(), BynderError> {
        debug!("Registering chunk {} of {}", sequence_number, init.s3file.upload_id);
        self.api_client
            .send_raw(
                Method::POST,
                &format!("api/v4/upload/{}/", init.s3file.upload_id),
                SendOptions::new()
                    .with_form_param("id", &init.s3file.upload_id)
                    .with_form_param("targetid", &init.s3file.target_id)
                    .with_form_param("filename", &init.part_filename(sequence_number.into()))
                    .with_form_param("chunkNumber", &sequence_number.to_string()),
            )
            .await?;
        Ok(())
    }

    async fn finalize_s3(
        &self,
        init: &UploadInit,
        file_name: &str,
        chunks: u64,
    ) -> Result<(String, Option<String>), BynderError> {
        let resp = self
            .api_client
            .send_raw(
                Method::POST,
                &format!("api/v4/upload/{}/", init.s3file.upload_id),
                SendOptions::new()
                    .with_form_param("id", &init.s3file.upload_id)
                    .with_form_param("targetid", &init.s3file.target_id)
                    .with_form_param("s3_filename", &init.part_filename(chunks))
                    .with_form_param("chunks", &chunks.to_string())
                    .with_form_param("original_filename", file_name),
            )
            .await?;
        let correlation_id = correlation_id(&resp);
        let body = decode_response(resp).await?.into_json()?;
        let import_id = match body.get("importId") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(BynderError::ResponseMissing()),
        };
        Ok((import_id, correlation_id))
    }

    async fn poll_status(&self, import_id: &str) -> Result<PollStatus, BynderError> {
        for iteration in 0..self.settings.max_poll_iterations {
            if iteration > 0 {
                tokio::time::sleep(self.settings.poll_delay).await;
            }
            debug!("Polling conversion of {} ({})", import_id, iteration + 1);
            let status = self
                .api_client
                .send(
                    Method::GET,
                    "api/v4/upload/poll/",
                    SendOptions::new().with_query_param("items", import_id),
                )
                .await?
                .into_json()?;
            if is_non_empty(status.get("itemsDone")) {
                return Ok(PollStatus::Done);
            }
            if is_non_empty(status.get("itemsFailed")) {
                return Ok(PollStatus::Failed);
            }
        }
        Ok(PollStatus::Exhausted)
    }

    async fn save_media(&self, file_id: &str, request: &UploadRequest) -> Result<Value, BynderError> {
        let path = request.save_path(file_id);
        info!("Saving {} via {}", file_id, path);
        self.api_client
            .send(
                Method::POST,
                &path,
                SendOptions::new().with_form(request.save_form()),
            )
            .await?
            .into_json()
    }
}

fn correlation_id(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn file_name(path: &Path) -> Result<String, BynderError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            BynderError::UploadValidation(format!("{} has no file name", path.display()))
        })
}
