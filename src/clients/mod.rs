//! CRM client implementations.
//!
//! - `MockCrmClient`: in-memory CRM (tests, dry runs)
//! - `HttpCrmClient`: REST CRM over HTTP (feature `http`)

use std::sync::Arc;

use tracing::info;

use crate::config::CrmConfig;
use crate::interfaces::{CrmClient, CrmError};

pub mod mock;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpCrmClient;
pub use mock::MockCrmClient;

/// Create the CRM client from configuration.
///
/// A disabled integration gets a client that reports itself unavailable, so
/// the dispatcher skips instead of failing.
pub fn create_crm_client(config: &CrmConfig) -> Result<Arc<dyn CrmClient>, CrmError> {
    if !config.enabled {
        info!("CRM: integration disabled");
        let mock = MockCrmClient::new();
        mock.set_available(false);
        return Ok(Arc::new(mock));
    }

    #[cfg(feature = "http")]
    {
        info!("CRM: http at {}", config.base_url);
        Ok(Arc::new(HttpCrmClient::new(config)?))
    }
    #[cfg(not(feature = "http"))]
    {
        Err(CrmError::Unavailable(
            "CRM enabled but 'http' feature is not enabled".to_string(),
        ))
    }
}
