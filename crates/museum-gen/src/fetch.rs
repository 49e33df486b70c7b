//! Asset Fetcher

use crate::cache::AssetCache;
use crate::service::{AssetLocator, SharedService};
use crate::stage::{run_blocking, with_timeout, StageLimits};
use museum_core::{AssetHandle, MuseumError, Result, ServiceFailure, Stage};
use std::sync::Arc;

/// Download the image `locator` names into the session cache.
///
/// The payload must decode as an image; anything else is a fetch failure
/// and nothing is written.
pub async fn fetch(
    service: &SharedService,
    cache: &Arc<AssetCache>,
    locator: &AssetLocator,
    limits: StageLimits,
) -> Result<AssetHandle> {
    let svc = service.clone();
    let cache = cache.clone();
    let loc = locator.clone();

    let handle = with_timeout(
        Stage::Fetch,
        limits.timeout,
        run_blocking(Stage::Fetch, move || {
            let bytes = svc.view(&loc).map_err(MuseumError::Fetch)?;
            let (format, dimensions) = inspect_image(&bytes).map_err(MuseumError::Fetch)?;
            let extension = format.extensions_str().first().copied().unwrap_or("img");
            cache.insert(&bytes, dimensions, extension, loc.to_string())
        }),
    )
    .await?;

    tracing::info!(
        asset = %locator,
        hash = %handle.hash().short(),
        bytes = handle.byte_len(),
        uri = %handle.uri(),
        "asset fetched"
    );
    Ok(handle)
}

/// Format and pixel dimensions of an encoded image
pub fn inspect_image(
    bytes: &[u8],
) -> std::result::Result<(image::ImageFormat, (u32, u32)), ServiceFailure> {
    if bytes.is_empty() {
        return Err(ServiceFailure::Malformed("empty image payload".to_string()));
    }
    let format = image::guess_format(bytes)
        .map_err(|e| ServiceFailure::Malformed(format!("unrecognised image payload: {}", e)))?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ServiceFailure::Malformed(format!("undecodable image payload: {}", e)))?;
    Ok((format, (img.width(), img.height())))
}
