//! Client-side security-token federation: exchange a locally held credential
//! (X.509 certificate, third-party JWT, or workload-identity subject token) for
//! short-lived session tokens with signed requests, single-flight renewal, and
//! bounded retries.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod breaker;
pub mod cert;
pub mod client;
pub mod error;
pub mod http;
pub mod obs;
pub mod provider;
pub mod retry;
pub mod sign;

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
