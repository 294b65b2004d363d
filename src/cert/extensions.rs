use std::io::Write;
use std::path::Path;

use const_oid::AssociatedOid;
use der::{Decode, oid::ObjectIdentifier};
use tempfile::TempPath;
use tracing::warn;
use x509_cert::ext::pkix::name::GeneralName;

use crate::error::{DecodeError, ExternalToolError, Result};

/// Trait for decoding X.509 extensions read back from issued certificates.
///
/// # Example
/// ```
/// use spiffekit::cert::extensions::{FromX509Extension, SubjectAltNameUris};
/// // SEQUENCE { [6] "spiffe://example/leaf" }
/// let mut der = vec![0x30, 23, 0x86, 21];
/// der.extend_from_slice(b"spiffe://example/leaf");
/// let san = SubjectAltNameUris::from_x509_extension_value(&der).unwrap();
/// assert_eq!(san.uris, vec!["spiffe://example/leaf".to_string()]);
/// ```
pub trait FromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Human-readable extension name used in error messages.
    const NAME: &'static str;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> std::result::Result<Self, DecodeError>
    where
        Self: Sized;
}

/// URI entries of a Subject Alternative Name (SAN) extension.
///
/// Other general name types in the extension are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltNameUris {
    pub uris: Vec<String>,
}

impl SubjectAltNameUris {
    pub fn single(uri: impl Into<String>) -> Self {
        Self {
            uris: vec![uri.into()],
        }
    }

    /// Renders the extension in toolkit configuration syntax.
    ///
    /// ```
    /// use spiffekit::cert::extensions::SubjectAltNameUris;
    /// let san = SubjectAltNameUris::single("spiffe://example/leaf");
    /// assert_eq!(san.to_config_line(), "subjectAltName=URI:spiffe://example/leaf\n");
    /// ```
    pub fn to_config_line(&self) -> String {
        let values: Vec<String> = self.uris.iter().map(|uri| format!("URI:{uri}")).collect();
        format!("subjectAltName={}\n", values.join(","))
    }
}

impl FromX509Extension for SubjectAltNameUris {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;
    const NAME: &'static str = "subjectAltName";

    fn from_x509_extension_value(extension: &[u8]) -> std::result::Result<Self, DecodeError> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)?;
        let uris = san
            .0
            .iter()
            .filter_map(|name| match name {
                GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
                _ => None,
            })
            .collect();
        Ok(Self { uris })
    }
}

/// Temporary extension file handed to the toolkit while signing a CSR.
///
/// The file is removed when the value is dropped, whichever way the signing
/// call exits. Removal failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct ExtensionFile {
    path: Option<TempPath>,
}

impl ExtensionFile {
    /// Creates `extfile-*.conf` in `dir` (or the system temp dir) holding `san`.
    pub fn create(dir: Option<&Path>, san: &SubjectAltNameUris) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("extfile-").suffix(".conf");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| ExternalToolError::setup("failed to create temporary extension file", e))?;

        file.write_all(san.to_config_line().as_bytes()).map_err(|e| {
            ExternalToolError::setup("failed to write to temporary extension file", e)
        })?;
        file.as_file()
            .sync_all()
            .map_err(|e| ExternalToolError::setup("failed to close temporary extension file", e))?;

        Ok(Self {
            path: Some(file.into_temp_path()),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }
}

impl Drop for ExtensionFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.display().to_string();
            if let Err(e) = path.close() {
                warn!(path = %shown, error = %e, "failed to remove temporary extension file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_file_holds_one_san_line_and_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let san = SubjectAltNameUris::single("spiffe://example/leaf");
        let ext = ExtensionFile::create(Some(dir.path()), &san).unwrap();
        let path = ext.path().to_path_buf();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("extfile-") && name.ends_with(".conf"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "subjectAltName=URI:spiffe://example/leaf\n"
        );

        drop(ext);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn drop_tolerates_an_already_removed_file() {
        let dir = tempfile::tempdir().unwrap();
        let ext =
            ExtensionFile::create(Some(dir.path()), &SubjectAltNameUris::single("spiffe://x"))
                .unwrap();
        std::fs::remove_file(ext.path()).unwrap();
        drop(ext);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn creation_in_missing_dir_fails_before_any_process() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let err = ExtensionFile::create(Some(&missing), &SubjectAltNameUris::single("spiffe://x"))
            .unwrap_err();
        assert_eq!(err.operation(), "failed to create temporary extension file");
        assert!(err.output().is_empty());
    }

    #[test]
    fn multiple_uris_share_one_line() {
        let san = SubjectAltNameUris {
            uris: vec!["spiffe://a".into(), "spiffe://b".into()],
        };
        assert_eq!(san.to_config_line(), "subjectAltName=URI:spiffe://a,URI:spiffe://b\n");
    }

    #[test]
    fn non_uri_names_are_skipped() {
        // SEQUENCE { [2] "a.example", [6] "spiffe://x" }
        let mut der = vec![0x30, 23, 0x82, 9];
        der.extend_from_slice(b"a.example");
        der.extend_from_slice(&[0x86, 10]);
        der.extend_from_slice(b"spiffe://x");
        let san = SubjectAltNameUris::from_x509_extension_value(&der).unwrap();
        assert_eq!(san, SubjectAltNameUris::single("spiffe://x"));
    }
}
