//! Path-based entry points, one per lifecycle and session operation.
//!
//! Each function runs against [`OpenSsl::default`], i.e. the `openssl` binary
//! found on `PATH`, and maps directly onto the typed API.

use std::path::Path;

use crate::cert::params::{CsrParams, RootCertificateParams, SigningParams};
use crate::cert::{self, Certificate, CertificateRole};
use crate::csr::CertificateSigningRequest;
use crate::error::Result;
use crate::issuer::CertificateAuthority;
use crate::key::KeyPair;
use crate::session::{ClientParams, ServerParams, TlsSession};
use crate::toolkit::OpenSsl;

/// Generates a private key for `algorithm` at `output`.
pub fn generate_private_key(algorithm: &str, output: impl AsRef<Path>) -> Result<()> {
    KeyPair::generate(&OpenSsl::default(), algorithm, output.as_ref()).map(drop)
}

/// Self-signs a root certificate with the key at `key`.
pub fn generate_root_certificate(
    key: impl AsRef<Path>,
    output: impl AsRef<Path>,
    subject: &str,
    identity_uri: &str,
    config: impl AsRef<Path>,
    validity_days: u32,
) -> Result<()> {
    let params = RootCertificateParams::builder()
        .key(key.as_ref())
        .output(output.as_ref())
        .subject(subject)
        .identity_uri(identity_uri)
        .config(config.as_ref())
        .validity_days(validity_days)
        .build();
    Certificate::self_signed(&OpenSsl::default(), &params).map(drop)
}

/// Generates a fresh key at `key_output` and a CSR for it at `csr_output`.
pub fn generate_csr(
    algorithm: &str,
    key_output: impl AsRef<Path>,
    csr_output: impl AsRef<Path>,
    subject: &str,
    identity_uri: &str,
    config: impl AsRef<Path>,
) -> Result<()> {
    let params = CsrParams::builder()
        .algorithm(algorithm)
        .key_output(key_output.as_ref())
        .csr_output(csr_output.as_ref())
        .subject(subject)
        .identity_uri(identity_uri)
        .config(config.as_ref())
        .build();
    CertificateSigningRequest::generate(&OpenSsl::default(), &params).map(drop)
}

/// Signs the CSR at `csr` with the CA certificate and key, asserting
/// `identity_uri` as the issued certificate's subject alternative name.
///
/// The CA serial counter lives next to `ca_cert` with an `.srl` extension.
pub fn sign_certificate(
    csr: impl AsRef<Path>,
    ca_cert: impl AsRef<Path>,
    ca_key: impl AsRef<Path>,
    identity_uri: &str,
    output: impl AsRef<Path>,
    validity_days: u32,
) -> Result<()> {
    let ca_cert = ca_cert.as_ref();
    // Unreadable roots are left for the toolkit to report.
    let root = Certificate::open(ca_cert, CertificateRole::Root)
        .unwrap_or_else(|_| Certificate::from_path(ca_cert, CertificateRole::Root, ""));
    let ca = CertificateAuthority::load(root, KeyPair::from_path(ca_key.as_ref()));
    let request = CertificateSigningRequest::from_path(csr.as_ref(), identity_uri);
    let params = SigningParams::builder()
        .output(output.as_ref())
        .validity_days(validity_days)
        .build();
    ca.sign(&OpenSsl::default(), request, &params).map(drop)
}

/// Succeeds exactly when the certificate at `cert` chains to `ca_cert`.
pub fn validate_certificate(cert: impl AsRef<Path>, ca_cert: impl AsRef<Path>) -> Result<()> {
    cert::validate_certificate(&OpenSsl::default(), cert.as_ref(), ca_cert.as_ref())
}

/// Starts a mutually authenticating TLS 1.3 server peer on port 4433.
pub fn start_server(
    cert: impl AsRef<Path>,
    key: impl AsRef<Path>,
    ca: impl AsRef<Path>,
) -> Result<TlsSession> {
    let params = ServerParams::builder()
        .cert(cert.as_ref())
        .key(key.as_ref())
        .ca(ca.as_ref())
        .build();
    TlsSession::start_server(&OpenSsl::default(), &params)
}

/// Starts a TLS 1.3 client peer connecting to `address`.
pub fn start_client(
    address: &str,
    cert: impl AsRef<Path>,
    key: impl AsRef<Path>,
    ca_cert: impl AsRef<Path>,
) -> Result<TlsSession> {
    let params = ClientParams::builder()
        .address(address)
        .cert(cert.as_ref())
        .key(key.as_ref())
        .ca_cert(ca_cert.as_ref())
        .build();
    TlsSession::start_client(&OpenSsl::default(), &params)
}
