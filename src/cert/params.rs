use std::path::PathBuf;

use bon::Builder;

/// Parameters for a self-signed root certificate.
///
/// The identity URI ends up twice in the certificate: inside `subject` if the
/// caller put it there, and as the `subjectAltName` URI. Neither is derived
/// from the other.
///
/// # Fields
/// * `key` - Existing private key of the root.
/// * `output` - Where the certificate is written.
/// * `subject` - Distinguished name in toolkit form, e.g. `/CN=root`.
/// * `identity_uri` - SPIFFE-style URI asserted as subject alternative name.
/// * `config` - Toolkit configuration file.
/// * `validity_days` - Lifetime of the certificate.
#[derive(Clone, Debug, Builder)]
pub struct RootCertificateParams {
    #[builder(into)]
    pub key: PathBuf,
    #[builder(into)]
    pub output: PathBuf,
    #[builder(into)]
    pub subject: String,
    #[builder(into)]
    pub identity_uri: String,
    #[builder(into)]
    pub config: PathBuf,
    pub validity_days: u32,
}

/// Parameters for generating a leaf key together with its CSR.
///
/// # Fields
/// * `algorithm` - Key specification understood by the toolkit, e.g. `rsa:2048`.
/// * `key_output` - Where the fresh private key is written.
/// * `csr_output` - Where the request is written.
/// * `subject` - Distinguished name in toolkit form.
/// * `identity_uri` - SPIFFE-style URI asserted as subject alternative name.
/// * `config` - Toolkit configuration file.
#[derive(Clone, Debug, Builder)]
pub struct CsrParams {
    #[builder(into)]
    pub algorithm: String,
    #[builder(into)]
    pub key_output: PathBuf,
    #[builder(into)]
    pub csr_output: PathBuf,
    #[builder(into)]
    pub subject: String,
    #[builder(into)]
    pub identity_uri: String,
    #[builder(into)]
    pub config: PathBuf,
}

/// Output location and lifetime of a certificate issued from a CSR.
#[derive(Clone, Debug, Builder)]
pub struct SigningParams {
    #[builder(into)]
    pub output: PathBuf,
    pub validity_days: u32,
}
