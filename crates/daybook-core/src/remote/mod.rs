//! Remote store
//!
//! Client for a self-hosted sync API. Authentication is a bearer-style
//! shared secret configured by the user.
//!
//! ## Endpoints
//!
//! - `GET  {endpoint}/api/settings` - cheap authenticated check
//! - `GET  {endpoint}/api/data` - bulk read of the full dataset
//! - `PUT  {endpoint}/api/{collection}/{id}` - create or replace a record
//! - `DELETE {endpoint}/api/{collection}/{id}` - delete a record
//! - `PUT  {endpoint}/api/settings` - replace the settings record
//!
//! `connect` and `fetch_all` either succeed completely or fail with a
//! [`RemoteError`]; nothing is adopted from a partial response.

pub mod client;
pub mod error;
pub mod wire;

pub use client::RemoteStore;
pub use error::RemoteError;
