/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

pub mod amazon;
pub mod api;
pub mod asset_bank;
pub mod auth;
pub mod chunks;
pub mod client;
pub mod config;
pub mod errors;
mod oauth1;
mod parsers;
pub mod pkce;
pub mod properties;
pub mod token;
pub mod upload;

pub use api::*;
pub use asset_bank::*;
pub use auth::*;
pub use client::*;
pub use config::*;
pub use errors::*;
pub use properties::*;
pub use token::*;
pub use upload::*;
