//! # Adrelay Adapters
//!
//! Platform adapters translating resource steps into platform API calls.
//!
//! A [`PlatformAdapter`] is built once per process from deployment settings
//! and opens an [`AdapterSession`] per provisioning run. Sessions hold the
//! run's credential and are dropped with the run.

pub mod adapter;
pub mod ads_api;
pub mod config;
pub mod creative;
pub mod graph;
pub mod search;
pub mod social;
pub mod video;
pub mod vocab;

mod transport;

pub use adapter::{AdapterResponse, AdapterResult, AdapterSession, PlatformAdapter, StepRequest};
pub use config::{AdsApiConfig, HttpSettings, SocialApiConfig};
pub use creative::{FetchedImage, ImageFetcher, ImageMime};
pub use search::SearchAdsAdapter;
pub use social::SocialAdsAdapter;
pub use video::VideoAdsAdapter;
