use std::io;
use std::path::PathBuf;

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;

/// Storage for one batch submission.
///
/// The scratch directory under the upload root is removed when the session
/// is closed or dropped; the output directory is kept for later downloads.
pub struct Session {
    pub id: String,
    scratch: TempDir,
    pub output_dir: PathBuf,
}

impl Session {
    pub fn create(config: &Config) -> io::Result<Self> {
        let id = Uuid::new_v4().to_string();

        std::fs::create_dir_all(&config.upload_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix(&id)
            .rand_bytes(0)
            .tempdir_in(&config.upload_dir)?;

        let output_dir = config.output_dir.join(&id);
        std::fs::create_dir_all(&output_dir)?;

        debug!(session_id = %id, scratch = %scratch.path().display(), "Session created");
        Ok(Self {
            id,
            scratch,
            output_dir,
        })
    }

    /// Persists an upload in the scratch area; the file is deleted on drop.
    pub async fn store_upload(&self, file_name: &str, content: &[u8]) -> io::Result<NamedTempFile> {
        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}.", file_name))
            .tempfile_in(self.scratch.path())?;
        tokio::fs::write(scratch.path(), content).await?;
        Ok(scratch)
    }

    /// Removes the scratch directory, logging instead of failing.
    pub fn close(self) {
        let path = self.scratch.path().to_path_buf();
        match self.scratch.close() {
            Ok(()) => debug!(session_id = %self.id, "Session upload directory removed"),
            Err(e) => warn!(
                session_id = %self.id,
                path = %path.display(),
                error = %e,
                "Could not remove session upload directory"
            ),
        }
    }
}

/// Deletes a scratch file now so a failure can be logged.
pub fn discard_upload(scratch: NamedTempFile) {
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!(path = %path.display(), error = %e, "Could not delete temporary upload");
    }
}
