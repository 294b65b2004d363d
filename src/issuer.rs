use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::info;

use crate::cert::extensions::{ExtensionFile, SubjectAltNameUris};
use crate::cert::params::{RootCertificateParams, SigningParams};
use crate::cert::{Certificate, CertificateRole};
use crate::csr::CertificateSigningRequest;
use crate::error::Result;
use crate::key::KeyPair;
use crate::toolkit::{CryptoToolInvoker, SignRequest};

/// The serial-number counter a CA persists between signings.
///
/// The toolkit creates the file on first use and increments it on every
/// signing. Signings through the same `SerialFile` value are serialized; other
/// processes writing the same file are not coordinated with.
#[derive(Debug)]
pub struct SerialFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SerialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Serial file next to `ca_cert`, with the extension replaced by `srl`.
    pub fn beside(ca_cert: &Path) -> Self {
        Self::new(ca_cert.with_extension("srl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hex serial that the next signing will start from, if the file exists yet.
    pub fn current(&self) -> std::io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Represents an entity capable of issuing certificates from CSRs.
///
/// This trait provides the issuer's material and a default `issue` that signs
/// through a [`CryptoToolInvoker`].
pub trait Issuer {
    /// Returns the certificate of the issuer.
    fn certificate(&self) -> &Certificate;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Returns the serial counter of the issuer.
    fn serial_file(&self) -> &SerialFile;

    /// Directory for the temporary extension file, `None` for the system temp dir.
    fn scratch_dir(&self) -> Option<&Path> {
        None
    }

    /// Issues a leaf certificate for `csr`.
    ///
    /// The CSR's identity URI is re-asserted as the subject alternative name
    /// through a temporary extension file, so the issued certificate carries
    /// it regardless of the extensions inside the request. The extension file
    /// is gone once this returns.
    ///
    /// # Arguments
    /// * `tool` - The toolkit performing the signature.
    /// * `csr` - The request; consumed.
    /// * `params` - Output path and lifetime of the certificate.
    ///
    /// # Returns
    /// A handle to the issued leaf certificate.
    fn issue<T>(
        &self,
        tool: &T,
        csr: CertificateSigningRequest,
        params: &SigningParams,
    ) -> Result<Certificate>
    where
        T: CryptoToolInvoker + ?Sized,
    {
        let san = SubjectAltNameUris::single(csr.identity_uri());
        let extensions = ExtensionFile::create(self.scratch_dir(), &san)?;

        let serial = self.serial_file();
        let _guard = serial.acquire();
        tool.sign_request(&SignRequest {
            csr: csr.path(),
            ca_cert: self.certificate().path(),
            ca_key: self.signing_key().path(),
            serial: serial.path(),
            extensions: extensions.path(),
            output: &params.output,
            validity_days: params.validity_days,
        })?;

        info!(
            identity = csr.identity_uri(),
            output = %params.output.display(),
            "issued leaf certificate"
        );
        Ok(Certificate::issued(
            params.output.clone(),
            CertificateRole::Leaf,
            csr.identity_uri().to_string(),
            params.validity_days,
        ))
    }
}

/// A root certificate together with its private key and serial counter.
#[derive(Debug)]
pub struct CertificateAuthority {
    certificate: Certificate,
    key: KeyPair,
    serial: SerialFile,
    scratch_dir: Option<PathBuf>,
}

impl CertificateAuthority {
    /// Self-signs a root certificate with `params.key` and wraps it as a CA.
    pub fn create_root<T>(tool: &T, params: &RootCertificateParams) -> Result<Self>
    where
        T: CryptoToolInvoker + ?Sized,
    {
        let certificate = Certificate::self_signed(tool, params)?;
        info!(
            identity = %params.identity_uri,
            output = %params.output.display(),
            "created root certificate"
        );
        Ok(Self::load(certificate, KeyPair::from_path(&params.key)))
    }

    /// Wraps an existing root certificate and key.
    pub fn load(certificate: Certificate, key: KeyPair) -> Self {
        let serial = SerialFile::beside(certificate.path());
        Self {
            certificate,
            key,
            serial,
            scratch_dir: None,
        }
    }

    pub fn with_serial_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.serial = SerialFile::new(path);
        self
    }

    /// Creates extension files in `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Signs `csr` into a leaf certificate. See [`Issuer::issue`].
    pub fn sign<T>(
        &self,
        tool: &T,
        csr: CertificateSigningRequest,
        params: &SigningParams,
    ) -> Result<Certificate>
    where
        T: CryptoToolInvoker + ?Sized,
    {
        self.issue(tool, csr, params)
    }
}

impl Issuer for CertificateAuthority {
    fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn serial_file(&self) -> &SerialFile {
        &self.serial
    }

    fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::cert::params::CsrParams;
    use crate::error::ExternalToolError;
    use crate::session::{ClientParams, ServerParams, TlsSession};

    /// Records what a signing call saw, including the extension file contents.
    #[derive(Default)]
    struct RecordingTool {
        seen: RefCell<Vec<(PathBuf, String, PathBuf)>>,
        fail: bool,
    }

    impl CryptoToolInvoker for RecordingTool {
        fn generate_key(&self, _: &str, _: &Path) -> Result<()> {
            Ok(())
        }

        fn self_sign(&self, _: &RootCertificateParams) -> Result<()> {
            Ok(())
        }

        fn request(&self, _: &CsrParams) -> Result<()> {
            Ok(())
        }

        fn sign_request(&self, request: &SignRequest<'_>) -> Result<()> {
            let contents = std::fs::read_to_string(request.extensions).unwrap();
            self.seen.borrow_mut().push((
                request.extensions.to_path_buf(),
                contents,
                request.serial.to_path_buf(),
            ));
            if self.fail {
                return Err(ExternalToolError::new(
                    "Failed to sign certificate",
                    std::io::Error::other("exit status: 1"),
                    "unable to load certificate request",
                ));
            }
            Ok(())
        }

        fn verify(&self, _: &Path, _: &Path) -> Result<()> {
            Ok(())
        }

        fn start_tls_server(&self, _: &ServerParams) -> Result<TlsSession> {
            unimplemented!()
        }

        fn start_tls_client(&self, _: &ClientParams) -> Result<TlsSession> {
            unimplemented!()
        }
    }

    fn authority(dir: &Path) -> CertificateAuthority {
        CertificateAuthority::load(
            Certificate::from_path(
                dir.join("root.crt"),
                CertificateRole::Root,
                "spiffe://example/root",
            ),
            KeyPair::from_path(dir.join("root.key")),
        )
        .with_scratch_dir(dir)
    }

    #[test]
    fn issue_reasserts_csr_identity_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RecordingTool::default();
        let ca = authority(dir.path());

        let csr =
            CertificateSigningRequest::from_path(dir.path().join("leaf.csr"), "spiffe://example/leaf");
        let params = SigningParams::builder()
            .output(dir.path().join("leaf.crt"))
            .validity_days(365)
            .build();
        let leaf = ca.sign(&tool, csr, &params).unwrap();

        assert_eq!(leaf.role(), CertificateRole::Leaf);
        assert_eq!(leaf.identity_uri(), "spiffe://example/leaf");
        assert_eq!(leaf.validity_days(), Some(365));

        let seen = tool.seen.borrow();
        let (ext_path, contents, serial) = &seen[0];
        assert_eq!(contents, "subjectAltName=URI:spiffe://example/leaf\n");
        assert_eq!(serial, &dir.path().join("root.srl"));
        assert!(!ext_path.exists());
    }

    #[test]
    fn failed_signing_still_removes_extension_file() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RecordingTool {
            fail: true,
            ..Default::default()
        };
        let ca = authority(dir.path());

        for _ in 0..3 {
            let csr =
                CertificateSigningRequest::from_path(dir.path().join("missing.csr"), "spiffe://x");
            let params = SigningParams::builder()
                .output(dir.path().join("leaf.crt"))
                .validity_days(1)
                .build();
            let err = ca.sign(&tool, csr, &params).unwrap_err();
            assert_eq!(err.operation(), "Failed to sign certificate");
        }

        assert_eq!(tool.seen.borrow().len(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn custom_serial_file_is_handed_to_the_tool() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RecordingTool::default();
        let ca = authority(dir.path()).with_serial_file(dir.path().join("ca.serial"));
        assert_eq!(ca.serial_file().current().unwrap(), None);

        let csr = CertificateSigningRequest::from_path("leaf.csr", "spiffe://x");
        let params = SigningParams::builder().output("leaf.crt").validity_days(1).build();
        ca.sign(&tool, csr, &params).unwrap();
        assert_eq!(tool.seen.borrow()[0].2, dir.path().join("ca.serial"));
    }
}
