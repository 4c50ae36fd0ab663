//! Transport port.

use std::path::Path;

use async_trait::async_trait;

use crate::update::UpdateResult;

/// Port for the download transport: fetch a URL into a local file.
///
/// The engine core only needs "fetch(url) -> local file, or failure";
/// everything else (redirects, TLS, retries, timeouts, a stalled transfer
/// eventually failing) is the implementation's concern. A call must resolve
/// exactly once - the orchestrator turns that resolution into exactly one
/// completion notification per submitted unit.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and write the body to `dest`, creating or truncating it.
    ///
    /// On failure the destination file's content is unspecified; callers
    /// treat the unit as not downloaded.
    async fn fetch(&self, url: &str, dest: &Path) -> UpdateResult<()>;
}
