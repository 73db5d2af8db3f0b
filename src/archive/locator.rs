//! Image locators.
//!
//! A locator addresses one instance's pixel data using the WADO-URI style
//! convention understood by the fetch backend:
//!
//! ```text
//! wadouri:{archive_base_url}/instances/{instance_id}/file
//! ```
//!
//! Locators are derived on demand and never persisted.

use std::fmt;
use std::sync::Arc;

use super::metadata::InstanceId;

/// Scheme prefix of every locator produced by this crate.
pub const LOCATOR_SCHEME: &str = "wadouri";

/// Dereferenceable identifier of one instance's pixel data.
///
/// Cheap to clone; used as the key of the decoded raster cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageLocator(Arc<str>);

impl ImageLocator {
    /// Wrap an arbitrary locator string. Use [`build_image_locator`] for
    /// archive instances.
    pub fn new(locator: impl Into<Arc<str>>) -> Self {
        Self(locator.into())
    }

    /// The full locator string, scheme included.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The addressing scheme (text before the first `:`).
    pub fn scheme(&self) -> &str {
        self.0.split_once(':').map(|(scheme, _)| scheme).unwrap_or("")
    }

    /// The HTTP URL behind a `wadouri:` locator.
    ///
    /// Returns `None` for locators using any other scheme.
    pub fn fetch_url(&self) -> Option<&str> {
        self.0
            .strip_prefix(LOCATOR_SCHEME)
            .and_then(|rest| rest.strip_prefix(':'))
    }
}

impl fmt::Display for ImageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the locator for `instance_id` on the archive at `archive_base_url`.
///
/// Pure and deterministic. Reachability is not checked here; a bad base URL
/// or unknown instance surfaces as a fetch failure later.
pub fn build_image_locator(archive_base_url: &str, instance_id: &InstanceId) -> ImageLocator {
    let base = archive_base_url.trim_end_matches('/');
    let instance = urlencoding::encode(instance_id.as_str());
    ImageLocator(format!("{}:{}/instances/{}/file", LOCATOR_SCHEME, base, instance).into())
}
