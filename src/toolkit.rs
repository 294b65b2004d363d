//! The narrow capability boundary between the certificate lifecycle and the
//! program that performs the cryptography.
//!
//! Every lifecycle step in this crate is expressed against
//! [`CryptoToolInvoker`]. [`OpenSsl`] implements it by spawning the `openssl`
//! command-line toolkit; another implementation could link a library instead
//! without touching [`crate::issuer`] or [`crate::csr`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use bon::Builder;

use crate::cert::params::{CsrParams, RootCertificateParams};
use crate::error::Result;
use crate::runner::ProcessRunner;
use crate::session::{ClientParams, ServerParams, SessionRole, TlsSession};

/// Program looked up on `PATH` when no explicit toolkit path is configured.
pub const DEFAULT_PROGRAM: &str = "openssl";

/// Port the TLS server peer listens on.
pub const DEFAULT_TLS_PORT: u16 = 4433;

/// Inputs of a single CSR signing call.
#[derive(Debug, Clone, Copy)]
pub struct SignRequest<'a> {
    pub csr: &'a Path,
    pub ca_cert: &'a Path,
    pub ca_key: &'a Path,
    /// Serial counter file, created on first use.
    pub serial: &'a Path,
    /// File holding the extensions to place in the issued certificate.
    pub extensions: &'a Path,
    pub output: &'a Path,
    pub validity_days: u32,
}

/// One method per primitive the certificate lifecycle needs from a PKI toolkit.
///
/// Implementations perform the operation to completion (or, for the TLS
/// peers, until the peer is running) and report any failure as an
/// [`ExternalToolError`](crate::error::ExternalToolError).
pub trait CryptoToolInvoker {
    /// Writes a fresh private key for `algorithm` to `output`.
    ///
    /// The algorithm identifier is passed through untouched.
    fn generate_key(&self, algorithm: &str, output: &Path) -> Result<()>;

    /// Writes a self-signed certificate for an existing key.
    fn self_sign(&self, params: &RootCertificateParams) -> Result<()>;

    /// Generates a new key together with a CSR for it.
    fn request(&self, params: &CsrParams) -> Result<()>;

    /// Signs a CSR with a CA certificate and key.
    fn sign_request(&self, request: &SignRequest<'_>) -> Result<()>;

    /// Succeeds exactly when `cert` chains to `ca_cert`.
    fn verify(&self, cert: &Path, ca_cert: &Path) -> Result<()>;

    /// Starts a mutually authenticating TLS server peer.
    fn start_tls_server(&self, params: &ServerParams) -> Result<TlsSession>;

    /// Starts a TLS client peer connecting to `params.address`.
    fn start_tls_client(&self, params: &ClientParams) -> Result<TlsSession>;
}

/// Protocol version pinned on both TLS peers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsVersion {
    Tls12,
    #[default]
    Tls13,
}

impl TlsVersion {
    fn flag(self) -> &'static str {
        match self {
            TlsVersion::Tls12 => "-tls1_2",
            TlsVersion::Tls13 => "-tls1_3",
        }
    }
}

/// [`CryptoToolInvoker`] backed by the OpenSSL command-line toolkit.
///
/// ```rust
/// use spiffekit::toolkit::{OpenSsl, TlsVersion};
///
/// let tool = OpenSsl::builder()
///     .program("/usr/local/bin/openssl")
///     .server_port(8443)
///     .build();
/// assert_eq!(tool.tls_version(), TlsVersion::Tls13);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct OpenSsl {
    #[builder(into, default = PathBuf::from(DEFAULT_PROGRAM))]
    program: PathBuf,
    /// Working directory of every spawned process.
    #[builder(into)]
    working_dir: Option<PathBuf>,
    #[builder(default)]
    tls_version: TlsVersion,
    #[builder(default = DEFAULT_TLS_PORT)]
    server_port: u16,
}

impl Default for OpenSsl {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl OpenSsl {
    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn tls_version(&self) -> TlsVersion {
        self.tls_version
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    fn runner(&self) -> ProcessRunner {
        let runner = ProcessRunner::new(&self.program);
        match &self.working_dir {
            Some(dir) => runner.with_working_dir(dir),
            None => runner,
        }
    }

    fn genpkey_args(algorithm: &str, output: &Path) -> Vec<OsString> {
        args![
            "genpkey",
            "-algorithm",
            algorithm,
            "-out",
            output,
        ]
    }

    fn self_sign_args(params: &RootCertificateParams) -> Vec<OsString> {
        args![
            "req",
            "-nodes",
            "-new",
            "-x509",
            "-key",
            &params.key,
            "-out",
            &params.output,
            "-days",
            params.validity_days.to_string(),
            "-subj",
            &params.subject,
            "-addext",
            san_uri(&params.identity_uri),
            "-config",
            &params.config,
        ]
    }

    fn request_args(params: &CsrParams) -> Vec<OsString> {
        args![
            "req",
            "-nodes",
            "-new",
            "-newkey",
            &params.algorithm,
            "-keyout",
            &params.key_output,
            "-out",
            &params.csr_output,
            "-subj",
            &params.subject,
            "-addext",
            san_uri(&params.identity_uri),
            "-config",
            &params.config,
        ]
    }

    fn sign_args(request: &SignRequest<'_>) -> Vec<OsString> {
        args![
            "x509",
            "-req",
            "-extfile",
            request.extensions,
            "-in",
            request.csr,
            "-CA",
            request.ca_cert,
            "-CAkey",
            request.ca_key,
            "-CAserial",
            request.serial,
            "-CAcreateserial",
            "-out",
            request.output,
            "-days",
            request.validity_days.to_string(),
        ]
    }

    fn verify_args(cert: &Path, ca_cert: &Path) -> Vec<OsString> {
        args!["verify", "-CAfile", ca_cert, cert]
    }

    fn server_args(&self, params: &ServerParams) -> Vec<OsString> {
        args![
            "s_server",
            "-accept",
            self.server_port.to_string(),
            "-state",
            "-cert",
            &params.cert,
            "-key",
            &params.key,
            self.tls_version.flag(),
            "-Verify",
            "1",
            "-CAfile",
            &params.ca,
            "-www",
        ]
    }

    fn client_args(&self, params: &ClientParams) -> Vec<OsString> {
        args![
            "s_client",
            "-connect",
            &params.address,
            "-state",
            "-cert",
            &params.cert,
            "-key",
            &params.key,
            self.tls_version.flag(),
            "-CAfile",
            &params.ca_cert,
        ]
    }
}

impl CryptoToolInvoker for OpenSsl {
    fn generate_key(&self, algorithm: &str, output: &Path) -> Result<()> {
        self.runner()
            .run("Failed to generate private key", Self::genpkey_args(algorithm, output))
            .map(drop)
    }

    fn self_sign(&self, params: &RootCertificateParams) -> Result<()> {
        self.runner()
            .run("Failed to generate root certificate", Self::self_sign_args(params))
            .map(drop)
    }

    fn request(&self, params: &CsrParams) -> Result<()> {
        self.runner()
            .run("Failed to generate CSR", Self::request_args(params))
            .map(drop)
    }

    fn sign_request(&self, request: &SignRequest<'_>) -> Result<()> {
        self.runner()
            .run("Failed to sign certificate", Self::sign_args(request))
            .map(drop)
    }

    fn verify(&self, cert: &Path, ca_cert: &Path) -> Result<()> {
        self.runner()
            .run("Failed to validate certificate", Self::verify_args(cert, ca_cert))
            .map(drop)
    }

    fn start_tls_server(&self, params: &ServerParams) -> Result<TlsSession> {
        let (child, stdin, stdout) = self
            .runner()
            .spawn_piped("Failed to start TLS server", self.server_args(params))?;
        Ok(TlsSession::from_parts(SessionRole::Server, child, stdin, stdout))
    }

    fn start_tls_client(&self, params: &ClientParams) -> Result<TlsSession> {
        let (child, stdin, stdout) = self
            .runner()
            .spawn_piped("Failed to start TLS client", self.client_args(params))?;
        Ok(TlsSession::from_parts(SessionRole::Client, child, stdin, stdout))
    }
}

/// `-addext` value asserting `uri` as the subject alternative name.
fn san_uri(uri: &str) -> String {
    format!("subjectAltName=URI:{uri}")
}
