/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

//! # Bynder
//!
//! This library was created for working with the Bynder digital asset management REST API.
//!
//! For further details on the Rest API refer to the [Bynder API Docs](https://bynder.docs.apiary.io/)
//!
//! ## Features
//!
//! - Authentication
//!     - OAuth2 authorization code grant with PKCE
//!     - OAuth2 client credentials grant
//!     - Permanent tokens
//!     - Legacy consumer key/secret request signing
//! - Expired OAuth2 tokens are refreshed before the request is sent
//! - Asset bank (brands, media, metaproperties, tags, categories, smart filters, derivatives,
//!   usage, collections)
//! - Chunked file upload, directly to Bynder or through the S3 multipart protocol
//! - Lower level interface for handling the raw communication
//!
//! *If you want to use this library for more that is currently implemented, the
//! [`v4::ApiClient`] is a way to make request/responses in a more direct way*
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! bynder = "0.1.0"
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bynder::v4::{Client, Configuration, RequestOptions, UploadRequest};
//!
//! async fn upload(domain: &str, client_id: &str, client_secret: &str) -> anyhow::Result<()> {
//!     // No redirect uri selects the client credentials grant
//!     let client = Client::new(Configuration::new(
//!         domain,
//!         None,
//!         client_id,
//!         client_secret,
//!         None,
//!         RequestOptions::default(),
//!     ))?;
//!
//!     let brands = client.asset_bank_manager().get_brands().await?;
//!     let brand_id = brands[0]["id"].as_str().unwrap_or_default();
//!
//!     let outcome = client
//!         .asset_bank_manager()
//!         .upload_file(
//!             UploadRequest::new("./photo.jpg")
//!                 .with_brand_id(brand_id)
//!                 .with_name("Photo"),
//!         )
//!         .await?;
//!     println!("Saved {} as {}", outcome.file_id, outcome.media);
//!     Ok(())
//! }
//! ```
//!
pub mod v4;
