#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use spiffekit::cert::Certificate;
use spiffekit::cert::params::{CsrParams, RootCertificateParams, SigningParams};
use spiffekit::csr::CertificateSigningRequest;
use spiffekit::issuer::CertificateAuthority;
use spiffekit::key::KeyPair;
use spiffekit::toolkit::OpenSsl;
use tempfile::TempDir;

/// Just enough toolkit configuration for `req` with and without `-x509`.
pub const OPENSSL_CNF: &str = "\
[ req ]
distinguished_name = req_distinguished_name
x509_extensions = v3_ca

[ req_distinguished_name ]

[ v3_ca ]
basicConstraints = critical, CA:TRUE
subjectKeyIdentifier = hash
keyUsage = critical, keyCertSign, cRLSign, digitalSignature
";

/// Returns true if the `openssl` CLI is on PATH.
pub fn openssl_available() -> bool {
    Command::new("openssl")
        .arg("version")
        .output()
        .is_ok_and(|o| o.status.success())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A scratch directory holding a toolkit configuration file.
pub struct Workspace {
    pub dir: TempDir,
    pub config: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = dir.path().join("ossl.cnf");
        std::fs::write(&config, OPENSSL_CNF).expect("write ossl.cnf");
        Self { dir, config }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

pub fn create_ca(tool: &OpenSsl, ws: &Workspace, name: &str) -> CertificateAuthority {
    let key = KeyPair::generate(tool, "ED25519", ws.path(&format!("{name}.key")))
        .expect("generate root key");
    let params = RootCertificateParams::builder()
        .key(key.path())
        .output(ws.path(&format!("{name}.crt")))
        .subject(format!("/CN={name}"))
        .identity_uri(format!("spiffe://example/{name}"))
        .config(&ws.config)
        .validity_days(3650)
        .build();
    CertificateAuthority::create_root(tool, &params).expect("create root")
}

pub fn request_leaf(tool: &OpenSsl, ws: &Workspace, name: &str) -> CertificateSigningRequest {
    let params = CsrParams::builder()
        .algorithm("rsa:2048")
        .key_output(ws.path(&format!("{name}.key")))
        .csr_output(ws.path(&format!("{name}.csr")))
        .subject(format!("/CN={name}"))
        .identity_uri(format!("spiffe://example/{name}"))
        .config(&ws.config)
        .build();
    let (_key, csr) = CertificateSigningRequest::generate(tool, &params).expect("generate CSR");
    csr
}

pub fn issue_leaf(
    tool: &OpenSsl,
    ws: &Workspace,
    ca: &CertificateAuthority,
    name: &str,
) -> Certificate {
    let csr = request_leaf(tool, ws, name);
    let params = SigningParams::builder()
        .output(ws.path(&format!("{name}.crt")))
        .validity_days(365)
        .build();
    ca.sign(tool, csr, &params).expect("sign leaf")
}

/// Number of `extfile-*` entries directly inside `dir`.
pub fn extension_files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("extfile-"))
        .count()
}
