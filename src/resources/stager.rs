use crate::error::StagingError;
use crate::remote::Channel;
use crate::remote::envelope::RemoteResourceHandle;
use crate::resources::store::ResourceStore;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Copies classpath resources from the controller store to a node.
#[derive(Debug, Clone)]
pub struct ResourceStager {
    store: ResourceStore,
}

impl ResourceStager {
    pub fn new(store: ResourceStore) -> Self {
        Self { store }
    }

    /// Copies every path below `remote_root` and returns one handle per path, in order.
    /// Content is copied again on every call; the first failure aborts the whole staging.
    pub async fn stage(
        &self,
        channel: &dyn Channel,
        resource_paths: &[String],
        remote_root: &Path,
    ) -> Result<Vec<RemoteResourceHandle>, StagingError> {
        // TODO skip unchanged trees once the agent can report content digests
        let mut handles = Vec::with_capacity(resource_paths.len());

        for path in resource_paths {
            let local = self.store.resolve(path)?;
            if !local.exists() {
                return Err(StagingError::MissingResource(local));
            }
            let remote = remote_root.join(path);
            copy_recursive(channel, &local, &remote).await?;

            let absolute = channel.resolve_path(&remote).await?;
            debug!(node = %channel.node_name(), resource = %path, remote = %absolute.display(), "Staged resource");
            handles.push(RemoteResourceHandle::new(absolute));
        }

        Ok(handles)
    }

    pub async fn clean(&self, channel: &dyn Channel, remote_root: &Path) -> Result<(), StagingError> {
        channel.remove_dir_all(remote_root).await?;
        Ok(())
    }
}

async fn copy_recursive(channel: &dyn Channel, local: &Path, remote: &Path) -> Result<(), StagingError> {
    let mut pending: Vec<(PathBuf, PathBuf)> = vec![(local.to_path_buf(), remote.to_path_buf())];

    while let Some((src, dst)) = pending.pop() {
        let metadata = fs::metadata(&src).await.map_err(|source| io_error(&src, source))?;

        if metadata.is_dir() {
            channel.create_dir_all(&dst).await?;
            let mut entries = fs::read_dir(&src).await.map_err(|source| io_error(&src, source))?;
            while let Some(entry) = entries.next_entry().await.map_err(|source| io_error(&src, source))? {
                pending.push((entry.path(), dst.join(entry.file_name())));
            }
        } else {
            let contents = fs::read(&src).await.map_err(|source| io_error(&src, source))?;
            channel.write_file(&dst, contents).await?;
        }
    }

    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> StagingError {
    StagingError::Io {
        path: path.to_path_buf(),
        source,
    }
}
