//! # SpiffeKit - SPIFFE-style X.509 Identities over the OpenSSL Toolkit
//!
//! SpiffeKit issues and validates X.509 certificates carrying SPIFFE-style URI
//! identities, and starts mutually authenticated TLS peers, by driving the
//! `openssl` command-line toolkit as a subprocess. No cryptography happens in
//! this crate: key generation, signing, verification and the TLS handshake are
//! all delegated to the toolkit, and its exit code is authoritative.
//!
//! ## Certificate Lifecycle
//!
//! A leaf identity goes `absent → key → CSR → certificate`; a root goes
//! `absent → key → self-signed certificate`. Each step is one blocking toolkit
//! invocation whose combined output is logged through `tracing`.
//!
//! Key algorithm identifiers are passed through untouched, so post-quantum
//! algorithms work whenever the toolkit has a provider for them.
//!
//! ## Quick Start
//!
//! ### Issuing a Leaf Identity
//!
//! ```rust,no_run
//! use spiffekit::{
//!     cert::params::{CsrParams, RootCertificateParams, SigningParams},
//!     csr::CertificateSigningRequest,
//!     issuer::{CertificateAuthority, Issuer},
//!     key::KeyPair,
//!     toolkit::OpenSsl,
//! };
//!
//! # fn main() -> Result<(), spiffekit::error::ExternalToolError> {
//! let tool = OpenSsl::default();
//!
//! // Root key and self-signed root certificate
//! let root_key = KeyPair::generate(&tool, "ED25519", "/tmp/root.key")?;
//! let ca = CertificateAuthority::create_root(
//!     &tool,
//!     &RootCertificateParams::builder()
//!         .key(root_key.path())
//!         .output("/tmp/root.crt")
//!         .subject("/CN=root")
//!         .identity_uri("spiffe://example/root")
//!         .config("/tmp/ossl.cnf")
//!         .validity_days(3650)
//!         .build(),
//! )?;
//!
//! // Leaf key and CSR in one step
//! let (_leaf_key, csr) = CertificateSigningRequest::generate(
//!     &tool,
//!     &CsrParams::builder()
//!         .algorithm("rsa:2048")
//!         .key_output("/tmp/leaf.key")
//!         .csr_output("/tmp/leaf.csr")
//!         .subject("/CN=leaf")
//!         .identity_uri("spiffe://example/leaf")
//!         .config("/tmp/ossl.cnf")
//!         .build(),
//! )?;
//!
//! // Sign and check the chain
//! let leaf = ca.sign(
//!     &tool,
//!     csr,
//!     &SigningParams::builder().output("/tmp/leaf.crt").validity_days(365).build(),
//! )?;
//! leaf.validate_against(&tool, ca.certificate())?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Starting a Mutually Authenticated Session
//!
//! ```rust,no_run
//! use std::io::Write;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = spiffekit::lifecycle::start_server("server.crt", "server.key", "root.crt")?;
//! let mut client = spiffekit::lifecycle::start_client(
//!     "127.0.0.1:4433",
//!     "client.crt",
//!     "client.key",
//!     "root.crt",
//! )?;
//! client.write_all(b"GET / HTTP/1.0\r\n\r\n")?;
//! client.close()?;
//! server.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every toolkit-backed operation fails with a single error type carrying the
//! operation description and whatever the toolkit printed:
//!
//! ```rust
//! use spiffekit::{key::KeyPair, toolkit::OpenSsl};
//!
//! let tool = OpenSsl::builder().program("/nonexistent/openssl").build();
//! match KeyPair::generate(&tool, "ED25519", "/tmp/never.key") {
//!     Ok(_) => unreachable!(),
//!     Err(e) => println!("{}: {}", e.operation(), e.output()),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`toolkit`]: The `CryptoToolInvoker` boundary and its OpenSSL implementation
//! - [`runner`]: Blocking and long-lived toolkit process execution
//! - [`key`]: Private key generation
//! - [`csr`]: Key plus certificate signing request generation
//! - [`cert`]: Certificate handles, validation and inspection
//! - [`issuer`]: Root creation and CSR signing
//! - [`session`]: TLS server and client peer processes
//! - [`lifecycle`]: Path-based functions, one per operation
//! - [`error`]: Error types

macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$(::std::ffi::OsString::from(
            ::std::convert::AsRef::<::std::ffi::OsStr>::as_ref(&$arg),
        )),*]
    };
}

pub mod cert;
pub mod csr;
pub mod error;
pub mod issuer;
pub mod key;
pub mod lifecycle;
pub mod runner;
pub mod session;
pub mod toolkit;
