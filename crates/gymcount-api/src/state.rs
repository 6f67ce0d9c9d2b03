//! Application state shared by the HTTP handlers.
//!
//! Holds the one `WindowedCounter` instance that the MQTT listener also
//! feeds, the listener's status handle, and the digest of the configured
//! API key.

use std::sync::Arc;

use gymcount_core::bus::ConnectorHandle;
use gymcount_core::presence::WindowedCounter;
use secrecy::{ExposeSecret, SecretString};

use crate::http::extractors::api_key::ApiKeyDigest;

#[derive(Clone)]
pub struct AppState {
    pub counter: Arc<WindowedCounter>,
    pub bus: ConnectorHandle,
    /// `None` when no key is configured; every trigger is then accepted.
    pub api_key: Option<ApiKeyDigest>,
}

impl AppState {
    pub fn new(
        counter: Arc<WindowedCounter>,
        bus: ConnectorHandle,
        api_key: Option<&SecretString>,
    ) -> Self {
        let api_key = api_key
            .filter(|key| !key.expose_secret().trim().is_empty())
            .map(ApiKeyDigest::from_secret);
        Self {
            counter,
            bus,
            api_key,
        }
    }
}
