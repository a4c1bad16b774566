//! Client for the OpenPixels image generation API.
//!
//! A job is submitted once, then polled until the server reports a result.
//! Poll attempts that hit their deadline are retried silently; anything else
//! that goes wrong is returned to the caller.
//!
//! ```no_run
//! use openpixels::{ClientConfig, Model, PixelsClient, SubmissionRequest};
//!
//! # async fn demo() -> openpixels::Result<()> {
//! let client = PixelsClient::new(ClientConfig::from_env())?;
//! let outcome = client
//!     .run(&SubmissionRequest::new(Model::FluxDev, "a cat"))
//!     .await?;
//! println!("{:?}", outcome.data);
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod transport;

pub use client::{CallOptions, PixelsClient, Session, Subscription};
pub use config::ClientConfig;
pub use error::{PixelsError, Result};
pub use models::*;
pub use transport::{HttpTransport, ReqwestTransport};
