pub mod extensions;
pub mod params;

use std::path::{Path, PathBuf};

use der::Decode;
use extensions::{FromX509Extension, SubjectAltNameUris};
use params::RootCertificateParams;
use time::OffsetDateTime;

use crate::error::{DecodeError, Result};
use crate::toolkit::CryptoToolInvoker;

/// Whether a certificate was self-signed or issued from a CSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateRole {
    Root,
    Leaf,
}

/// Handle to a certificate file produced by the toolkit.
///
/// The handle records what the certificate was issued for; the file itself
/// remains the source of truth and can be inspected with
/// [`Certificate::identity_uris`] and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    path: PathBuf,
    role: CertificateRole,
    identity_uri: String,
    validity_days: Option<u32>,
}

impl Certificate {
    /// Refers to an existing certificate file.
    pub fn from_path(
        path: impl Into<PathBuf>,
        role: CertificateRole,
        identity_uri: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            role,
            identity_uri: identity_uri.into(),
            validity_days: None,
        }
    }

    /// Refers to an existing certificate file, taking the identity from the
    /// first URI in its Subject Alternative Name.
    pub fn open(
        path: impl Into<PathBuf>,
        role: CertificateRole,
    ) -> std::result::Result<Self, DecodeError> {
        let mut cert = Self::from_path(path, role, String::new());
        cert.identity_uri = cert
            .identity_uris()?
            .into_iter()
            .next()
            .ok_or(DecodeError::MissingExtension(SubjectAltNameUris::NAME))?;
        Ok(cert)
    }

    pub(crate) fn issued(
        path: PathBuf,
        role: CertificateRole,
        identity_uri: String,
        validity_days: u32,
    ) -> Self {
        Self {
            path,
            role,
            identity_uri,
            validity_days: Some(validity_days),
        }
    }

    /// Creates a self-signed root certificate from an existing key.
    ///
    /// # Arguments
    /// * `tool` - The toolkit performing the signature.
    /// * `params` - Key, output, subject, identity, config and lifetime.
    ///
    /// # Returns
    /// A handle to the written root certificate.
    pub fn self_signed<T>(tool: &T, params: &RootCertificateParams) -> Result<Self>
    where
        T: CryptoToolInvoker + ?Sized,
    {
        tool.self_sign(params)?;
        Ok(Self::issued(
            params.output.clone(),
            CertificateRole::Root,
            params.identity_uri.clone(),
            params.validity_days,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn role(&self) -> CertificateRole {
        self.role
    }

    /// Identity URI the certificate was issued for.
    pub fn identity_uri(&self) -> &str {
        &self.identity_uri
    }

    /// Lifetime requested at issuance, unknown for handles built with
    /// [`Certificate::from_path`].
    pub fn validity_days(&self) -> Option<u32> {
        self.validity_days
    }

    /// Verifies that this certificate chains to `ca`.
    ///
    /// The toolkit's diagnostic text is carried in the error on failure.
    pub fn validate_against<T>(&self, tool: &T, ca: &Certificate) -> Result<()>
    where
        T: CryptoToolInvoker + ?Sized,
    {
        validate_certificate(tool, &self.path, &ca.path)
    }

    fn read_x509(&self) -> std::result::Result<x509_cert::Certificate, DecodeError> {
        let bytes = std::fs::read(&self.path)?;
        let pem = pem::parse(bytes)?;
        if pem.tag() != "CERTIFICATE" {
            return Err(DecodeError::Der(format!(
                "expected CERTIFICATE block, found {}",
                pem.tag()
            )));
        }
        Ok(x509_cert::Certificate::from_der(pem.contents())?)
    }

    /// URIs asserted in the certificate's Subject Alternative Name extension.
    pub fn identity_uris(&self) -> std::result::Result<Vec<String>, DecodeError> {
        let cert = self.read_x509()?;
        let extension = cert
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == SubjectAltNameUris::OID)
            .ok_or(DecodeError::MissingExtension(SubjectAltNameUris::NAME))?;
        let san = SubjectAltNameUris::from_x509_extension_value(extension.extn_value.as_bytes())?;
        Ok(san.uris)
    }

    /// True when subject and issuer names are identical.
    pub fn is_self_signed(&self) -> std::result::Result<bool, DecodeError> {
        let tbs = self.read_x509()?.tbs_certificate;
        Ok(tbs.subject == tbs.issuer)
    }

    /// End of the validity period written by the toolkit.
    pub fn not_after(&self) -> std::result::Result<OffsetDateTime, DecodeError> {
        let tbs = self.read_x509()?.tbs_certificate;
        let secs = tbs.validity.not_after.to_unix_duration().as_secs();
        let secs = i64::try_from(secs).map_err(|e| DecodeError::Der(e.to_string()))?;
        OffsetDateTime::from_unix_timestamp(secs).map_err(|e| DecodeError::Der(e.to_string()))
    }
}

/// Verifies that the certificate at `cert` chains to the CA certificate at `ca_cert`.
pub fn validate_certificate<T>(tool: &T, cert: &Path, ca_cert: &Path) -> Result<()>
where
    T: CryptoToolInvoker + ?Sized,
{
    tool.verify(cert, ca_cert)
}
