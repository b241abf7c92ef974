use std::io;
use std::path::PathBuf;
use tracing::debug;

use super::types::PricingCachePayload;

const CACHE_FILE: &str = "pricing.json";

/// Default cache directory: ~/.cache/agentcost
pub(crate) fn default_cache_dir() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".cache").join("agentcost"))
}

/// Pricing cache file. Without a path every read misses and writes are no-ops.
#[derive(Debug, Clone, Default)]
pub(crate) struct PricingCache {
    path: Option<PathBuf>,
}

impl PricingCache {
    pub(crate) fn in_dir(dir: Option<PathBuf>) -> Self {
        Self {
            path: dir.map(|d| d.join(CACHE_FILE)),
        }
    }

    /// Missing, unreadable, corrupt or empty files are all cache misses.
    pub(crate) async fn read(&self) -> Option<PricingCachePayload> {
        let path = self.path.as_ref()?;
        let bytes = tokio::fs::read(path).await.ok()?;
        match serde_json::from_slice::<PricingCachePayload>(&bytes) {
            Ok(payload) => payload.validated(),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Ignoring unreadable pricing cache");
                None
            }
        }
    }

    /// Write via a temp file and rename, so readers never see a partial file.
    pub(crate) async fn write(&self, payload: &PricingCachePayload) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(payload).map_err(io::Error::other)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err);
        }
        Ok(())
    }
}
