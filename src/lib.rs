//! Dashboard datasource for Mango-style REST time-series services.
//!
//! A host query goes through [`normalize`], is turned into a REST call by
//! [`request::RequestBuilder`], executed by a [`transport::Transport`] and
//! shaped back into the host's table format by [`response`].

pub mod api;
pub mod config;
pub mod datasource;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod request;
pub mod response;
pub mod template;
pub mod transport;

pub use datasource::MangoDatasource;
pub use error::{DatasourceError, Result, TransportError};
