use crate::Result;

use std::sync::Arc;
use tabula_core::{Driver, Error};
use url::Url;

/// Creates the driver for a connection URL. The URL scheme picks the
/// driver; each one sits behind a cargo feature.
pub fn connect(url: &str) -> Result<Arc<dyn Driver>> {
    let parsed = Url::parse(url).map_err(|err| Error::invalid_connection_url(format!("{err}; url={url}")))?;

    match parsed.scheme() {
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(tabula_driver_sqlite::Sqlite::new(url)?)),
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(Error::unsupported_feature("`sqlite` feature not enabled")),

        scheme => Err(Error::invalid_connection_url(format!(
            "unsupported database; scheme={scheme}; url={url}"
        ))),
    }
}
