//! Persisted cluster identifier
//!
//! All nodes of one cluster must be formatted with the same id. The id is
//! generated once per workspace and read back on every later call.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::command::ToolError;
use super::kafka::KafkaTools;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Failed to generate cluster id: {0}")]
    Generate(#[from] ToolError),

    #[error("Cluster id tool returned an empty id")]
    Empty,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct ClusterIdentity {
    path: PathBuf,
    tools: KafkaTools,
}

impl ClusterIdentity {
    pub fn new(path: impl Into<PathBuf>, tools: KafkaTools) -> Self {
        Self {
            path: path.into(),
            tools,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The persisted id, if one exists
    pub fn load(&self) -> Result<Option<String>, IdentityError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(IdentityError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Return the persisted id, generating and persisting one if absent
    pub async fn load_or_create(&self) -> Result<String, IdentityError> {
        if let Some(id) = self.load()? {
            return Ok(id);
        }

        let id = self.tools.random_uuid().await?;
        if id.is_empty() {
            return Err(IdentityError::Empty);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| IdentityError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, &id).map_err(|source| IdentityError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!("Generated cluster id {}", id);
        Ok(id)
    }
}
