/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use strum_macros::{EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssetType {
    Image,
    Document,
    Audio,
    Video,
    #[serde(rename = "3d")]
    #[strum(serialize = "3d")]
    ThreeD,
}

/// Which file of a media item a download url is requested for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum DownloadType {
    #[default]
    Original,
    Additional,
}

/// Filters for listing media
#[derive(Debug, Clone, Default, Serialize)]
pub struct MediaQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<AssetType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(rename = "brandId", skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<String>,
    #[serde(rename = "propertyOptionId", skip_serializing_if = "Vec::is_empty")]
    pub property_option_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<bool>,
    /// Any filter not modelled above, e.g. `property_{name}`
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Filters for listing collections
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetapropertyQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Usage record of an asset in an external integration
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageQuery {
    #[serde(rename = "integration_id", skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<String>,
    #[serde(rename = "asset_id", skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}
