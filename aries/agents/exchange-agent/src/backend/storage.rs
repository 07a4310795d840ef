use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::AgentResult;

/// Minimal file storage used by the agent for small cached values.
///
/// Paths passed to the operations are relative to [`FileSystem::base_path`].
#[async_trait]
pub trait FileSystem: Send + Sync {
    fn base_path(&self) -> &Path;

    async fn exists(&self, path: &Path) -> AgentResult<bool>;

    async fn read(&self, path: &Path) -> AgentResult<String>;

    async fn write(&self, path: &Path, data: &str) -> AgentResult<()>;
}

#[derive(Clone, Debug)]
pub struct LocalFileSystem {
    base_path: PathBuf,
}

impl LocalFileSystem {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.base_path.join(path)
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    fn base_path(&self) -> &Path {
        &self.base_path
    }

    async fn exists(&self, path: &Path) -> AgentResult<bool> {
        Ok(tokio::fs::try_exists(self.resolve(path)).await?)
    }

    async fn read(&self, path: &Path) -> AgentResult<String> {
        Ok(tokio::fs::read_to_string(self.resolve(path)).await?)
    }

    async fn write(&self, path: &Path, data: &str) -> AgentResult<()> {
        let path = self.resolve(path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        trace!("LocalFileSystem::write >> path: {}", path.display());
        Ok(tokio::fs::write(path, data).await?)
    }
}
