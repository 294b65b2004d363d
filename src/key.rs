use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::toolkit::CryptoToolInvoker;

/// Handle to a private key file written by the toolkit.
///
/// There is no in-memory key material; later steps refer to the key by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    algorithm: Option<String>,
    path: PathBuf,
}

impl KeyPair {
    /// Generate a key pair for `algorithm` and write it to `output`.
    ///
    /// The algorithm identifier is opaque here. Classical names such as
    /// `ED25519` or `RSA` work, as do post-quantum identifiers when the
    /// toolkit has a provider for them; unsupported names fail in the toolkit.
    pub fn generate<T>(tool: &T, algorithm: &str, output: impl Into<PathBuf>) -> Result<Self>
    where
        T: CryptoToolInvoker + ?Sized,
    {
        let path = output.into();
        tool.generate_key(algorithm, &path)?;
        Ok(Self {
            algorithm: Some(algorithm.to_string()),
            path,
        })
    }

    /// Refers to a key that already exists on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            algorithm: None,
            path: path.into(),
        }
    }

    pub(crate) fn generated_with(algorithm: &str, path: PathBuf) -> Self {
        Self {
            algorithm: Some(algorithm.to_string()),
            path,
        }
    }

    /// Algorithm the key was generated with, if this handle generated it.
    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
