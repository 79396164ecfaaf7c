use std::io::Result as IoResult;
use std::path::Path;

use log::debug;
use tokio::fs::create_dir_all;

/// Create `path` and any missing parents. A no-op when it already exists.
pub async fn ensure_exists(path: &Path) -> IoResult<()> {
    create_dir_all(path).await?;
    debug!("Cache directory ready at {}", path.display());
    Ok(())
}
