//! On-disk store of fetched resource documents
//!
//! Each finished resource is kept as `<kind>_<hex>.json` in a single
//! directory, so local models can be rebuilt without the network.

use crate::error::Result;
use crate::resource::{Resource, ResourceId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Directory of resource JSON documents
#[derive(Debug, Clone)]
pub struct ResourceStore {
    dir: PathBuf,
}

impl ResourceStore {
    /// Open a store, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &ResourceId) -> PathBuf {
        self.dir.join(id.storage_name())
    }

    /// Read a stored resource
    ///
    /// Returns `None` when the file is absent, or when it is unreadable JSON
    /// or names a different resource, so that the caller fetches it again.
    pub async fn load(&self, id: &ResourceId) -> Result<Option<Resource>> {
        let path = self.path_for(id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let parsed = serde_json::from_str(&content)
            .map_err(crate::error::Error::from)
            .and_then(Resource::from_json);
        match parsed {
            Ok(resource) if resource.id() == id => {
                debug!(resource = %id, path = %path.display(), "Loaded stored resource");
                Ok(Some(resource))
            }
            Ok(other) => {
                warn!(
                    resource = %id,
                    found = %other.id(),
                    path = %path.display(),
                    "Stored file holds another resource, ignoring it"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(
                    resource = %id,
                    path = %path.display(),
                    error = %e,
                    "Corrupt stored resource"
                );
                Ok(None)
            }
        }
    }

    /// Write a resource document, replacing any previous copy
    pub async fn save(&self, resource: &Resource) -> Result<PathBuf> {
        let path = self.path_for(resource.id());
        let content = serde_json::to_string_pretty(&resource.object)?;
        fs::write(&path, content).await?;
        debug!(resource = %resource.id(), path = %path.display(), "Stored resource");
        Ok(path)
    }

    /// Delete a stored resource; absent files are not an error
    pub async fn remove(&self, id: &ResourceId) -> Result<()> {
        match fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
