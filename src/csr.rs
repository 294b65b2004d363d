use std::path::{Path, PathBuf};

use crate::cert::params::CsrParams;
use crate::error::Result;
use crate::key::KeyPair;
use crate::toolkit::CryptoToolInvoker;

/// Handle to a certificate signing request file.
///
/// Not `Clone`: a request is consumed by the one signing call that turns it
/// into a certificate.
#[derive(Debug, PartialEq, Eq)]
pub struct CertificateSigningRequest {
    path: PathBuf,
    subject: Option<String>,
    identity_uri: String,
}

impl CertificateSigningRequest {
    /// Generates a fresh key and a CSR for it in a single toolkit call.
    ///
    /// # Returns
    /// The new key and the request carrying `params.subject` and
    /// `params.identity_uri`.
    pub fn generate<T>(tool: &T, params: &CsrParams) -> Result<(KeyPair, Self)>
    where
        T: CryptoToolInvoker + ?Sized,
    {
        tool.request(params)?;
        let key = KeyPair::generated_with(&params.algorithm, params.key_output.clone());
        let csr = Self {
            path: params.csr_output.clone(),
            subject: Some(params.subject.clone()),
            identity_uri: params.identity_uri.clone(),
        };
        Ok((key, csr))
    }

    /// Refers to an existing request asserting `identity_uri`.
    pub fn from_path(path: impl Into<PathBuf>, identity_uri: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            subject: None,
            identity_uri: identity_uri.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Subject distinguished name, known when this handle generated the request.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn identity_uri(&self) -> &str {
        &self.identity_uri
    }
}
