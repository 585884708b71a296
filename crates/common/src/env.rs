//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::{info, warn};

/// Ensure the export directory exists and is not world-readable.
pub async fn ensure_private_dir(dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = tokio::fs::set_permissions(dir, perms).await {
            warn!(dir = %dir.display(), error = %e, "cannot restrict export directory permissions");
        }
    }

    info!(dir = %dir.display(), "export directory ready");
    Ok(())
}
