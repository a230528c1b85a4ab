//! Key material providers: the descriptor's only I/O dependency.

use super::error::{StackError, StackResult};
use std::path::{Path, PathBuf};

/// Source of the public key embedded in the stack's key pair.
pub trait KeyMaterialProvider {
    /// Return the public key material, verbatim.
    fn public_key(&self) -> StackResult<String>;

    /// Where the material comes from, for logs.
    fn describe(&self) -> String;
}

/// Reads key material from a local file as UTF-8.
#[derive(Debug, Clone)]
pub struct FileKeyProvider {
    path: PathBuf,
}

impl FileKeyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyMaterialProvider for FileKeyProvider {
    fn public_key(&self) -> StackResult<String> {
        let bytes = std::fs::read(&self.path).map_err(|source| StackError::KeyMaterial {
            path: self.path.clone(),
            source,
        })?;
        String::from_utf8(bytes).map_err(|_| StackError::KeyEncoding {
            path: self.path.clone(),
        })
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Fixed in-memory key material.
#[derive(Debug, Clone)]
pub struct StaticKeyProvider(pub String);

impl KeyMaterialProvider for StaticKeyProvider {
    fn public_key(&self) -> StackResult<String> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        "inline key material".to_string()
    }
}
