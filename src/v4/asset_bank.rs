/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v4::api::{ApiClient, ApiParams, SendOptions, owned_params};
use crate::v4::errors::BynderError;
use crate::v4::parsers::to_params;
use crate::v4::properties::{
    CollectionQuery, DownloadType, MediaQuery, MetapropertyQuery, UsageQuery,
};
use crate::v4::upload::{FileUploader, UploadOutcome, UploadRequest, UploadSettings};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Asset bank endpoints: brands, media, metaproperties, tags, usage and collections.
///
/// See [Bynder API Docs](https://bynder.docs.apiary.io/) for the response shapes.
#[derive(Debug)]
pub struct AssetBankManager {
    api_client: Arc<ApiClient>,
    file_uploader: FileUploader,
}

impl AssetBankManager {
    pub fn new(api_client: Arc<ApiClient>, upload_settings: UploadSettings) -> Self {
        Self {
            file_uploader: FileUploader::new(api_client.clone(), upload_settings),
            api_client,
        }
    }

    pub fn file_uploader(&self) -> &FileUploader {
        &self.file_uploader
    }

    /// Brands and their sub brands
    pub async fn get_brands(&self) -> Result<Value, BynderError> {
        self.get("api/v4/brands/", Vec::new()).await
    }

    pub async fn get_media_list(&self, query: Option<&MediaQuery>) -> Result<Value, BynderError> {
        let params = match query {
            Some(query) => to_params(query)?,
            None => Vec::new(),
        };
        self.get("api/v4/media/", params).await
    }

    /// Media item, optionally with all its versions. `params` are passed through as query
    /// parameters.
    pub async fn get_media_info(
        &self,
        media_id: &str,
        versions: Option<bool>,
        params: Option<&ApiParams<'_>>,
    ) -> Result<Value, BynderError> {
        let mut params = owned_params(params);
        if let Some(v) = versions {
            params.retain(|(k, _)| k != "versions");
            params.push(("versions".to_string(), bool_param(v)));
        }
        self.get(&format!("api/v4/media/{}/", media_id), params)
            .await
    }

    /// Updates media fields such as name, description or metaproperty options
    pub async fn modify_media(
        &self,
        media_id: &str,
        data: &ApiParams<'_>,
    ) -> Result<Value, BynderError> {
        self.send(
            Method::POST,
            &format!("api/v4/media/{}/", media_id),
            SendOptions::new().with_form(owned_params(Some(data))),
        )
        .await
    }

    pub async fn delete_media(&self, media_id: &str) -> Result<Value, BynderError> {
        self.send(
            Method::DELETE,
            &format!("api/v4/media/{}/", media_id),
            SendOptions::new(),
        )
        .await
    }

    pub async fn get_media_download_location(
        &self,
        media_id: &str,
        download_type: DownloadType,
    ) -> Result<Value, BynderError> {
        let kind: &'static str = download_type.into();
        self.get(
            &format!("api/v4/media/{}/download/", media_id),
            vec![("type".to_string(), kind.to_string())],
        )
        .await
    }

    pub async fn get_media_download_location_by_version(
        &self,
        media_id: &str,
        version: u32,
    ) -> Result<Value, BynderError> {
        self.get(
            &format!("api/v4/media/{}/{}/download/", media_id, version),
            Vec::new(),
        )
        .await
    }

    /// Download location of a single item. `hash` marks `item_id` as a hashed id.
    pub async fn get_media_download_location_for_asset_item(
        &self,
        media_id: &str,
        item_id: &str,
        hash: bool,
    ) -> Result<Value, BynderError> {
        self.get(
            &format!("api/v4/media/{}/download/{}/", media_id, item_id),
            vec![("hash".to_string(), bool_param(hash))],
        )
        .await
    }

    pub async fn get_metaproperties(
        &self,
        query: Option<&MetapropertyQuery>,
    ) -> Result<Value, BynderError> {
        let params = match query {
            Some(query) => to_params(query)?,
            None => Vec::new(),
        };
        self.get("api/v4/metaproperties/", params).await
    }

    pub async fn get_metaproperty(&self, metaproperty_id: &str) -> Result<Value, BynderError> {
        self.get(
            &format!("api/v4/metaproperties/{}/", metaproperty_id),
            Vec::new(),
        )
        .await
    }

    pub async fn get_metaproperty_dependencies(
        &self,
        metaproperty_id: &str,
    ) -> Result<Value, BynderError> {
        self.get(
            &format!("api/v4/metaproperties/{}/dependencies/", metaproperty_id),
            Vec::new(),
        )
        .await
    }

    /// Options of all metaproperties, filtered by `ids` when given
    pub async fn get_metaproperty_options(
        &self,
        query: Option<&MetapropertyQuery>,
    ) -> Result<Value, BynderError> {
        let params = match query {
            Some(query) => to_params(query)?,
            None => Vec::new(),
        };
        self.get("api/v4/metaproperties/options/", params).await
    }

    pub async fn get_metaproperty_global_option_dependencies(&self) -> Result<Value, BynderError> {
        self.get("api/v4/metaproperties/options/dependencies/", Vec::new())
            .await
    }

    pub async fn get_metaproperty_option_dependencies(
        &self,
        metaproperty_id: &str,
    ) -> Result<Value, BynderError> {
        self.get(
            &format!(
                "api/v4/metaproperties/{}/options/dependencies/",
                metaproperty_id
            ),
            Vec::new(),
        )
        .await
    }

    pub async fn get_metaproperty_specific_option_dependencies(
        &self,
        metaproperty_id: &str,
        option_id: &str,
        params: Option<&ApiParams<'_>>,
    ) -> Result<Value, BynderError> {
        self.get(
            &format!(
                "api/v4/metaproperties/{}/options/{}/dependencies/",
                metaproperty_id, option_id
            ),
            owned_params(params),
        )
        .await
    }

    pub async fn get_tags(&self, params: Option<&ApiParams<'_>>) -> Result<Value, BynderError> {
        self.get("api/v4/tags/", owned_params(params)).await
    }

    pub async fn get_categories(&self) -> Result<Value, BynderError> {
        self.get("api/v4/categories", Vec::new()).await
    }

    pub async fn get_smartfilters(&self) -> Result<Value, BynderError> {
        self.get("api/v4/smartfilters", Vec::new()).await
    }

    pub async fn get_derivatives(&self) -> Result<Value, BynderError> {
        self.get("api/v4/account/derivatives/", Vec::new()).await
    }

    /// Records that an asset is used by an integration
    pub async fn create_usage(&self, usage: &UsageQuery) -> Result<Value, BynderError> {
        self.send(
            Method::POST,
            "api/media/usage",
            SendOptions::new().with_form(to_params(usage)?),
        )
        .await
    }

    pub async fn get_usage(&self, query: Option<&UsageQuery>) -> Result<Value, BynderError> {
        let params = match query {
            Some(query) => to_params(query)?,
            None => Vec::new(),
        };
        self.get("api/media/usage", params).await
    }

    pub async fn delete_usage(&self, usage: &UsageQuery) -> Result<Value, BynderError> {
        self.send(
            Method::DELETE,
            "api/media/usage",
            SendOptions::new().with_query(to_params(usage)?),
        )
        .await
    }

    pub async fn get_collections(
        &self,
        query: Option<&CollectionQuery>,
    ) -> Result<Value, BynderError> {
        let params = match query {
            Some(query) => to_params(query)?,
            None => Vec::new(),
        };
        self.get("api/v4/collections/", params).await
    }

    /// Ids of the media in a collection
    pub async fn get_collection_assets(&self, collection_id: &str) -> Result<Value, BynderError> {
        self.get(
            &format!("api/v4/collections/{}/media/", collection_id),
            Vec::new(),
        )
        .await
    }

    /// Uploads a file and saves it as media. See [`FileUploader::upload_file`].
    pub async fn upload_file(&self, request: UploadRequest) -> Result<UploadOutcome, BynderError> {
        self.file_uploader.upload_file(request).await
    }

    async fn get(&self, path: &str, query: Vec<(String, String)>) -> Result<Value, BynderError> {
        self.send(Method::GET, path, SendOptions::new().with_query(query))
            .await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        options: SendOptions,
    ) -> Result<Value, BynderError> {
        self.api_client
            .send(method, path, options)
            .await?
            .into_json()
    }
}

fn bool_param(v: bool) -> String {
    if v { "1" } else { "0" }.to_string()
}
