//! The closed set of supported webhook vendor categories.
//!
//! Vendor dispatch is a tagged enum resolved once at the Gateway boundary;
//! downstream components (Verifier, Normalizer) operate on the typed
//! variant and never re-inspect a category string. Each category carries a
//! fixed signature scheme — the mapping is exhaustive and explicit, never
//! inferred from the payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A supported webhook vendor category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorKind {
    /// Passage access-control family (doors, readers, panels).
    Passage,
    /// Lumen video family (cameras, analytics events).
    Lumen,
}

/// The HMAC digest algorithm a vendor signs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// HMAC-SHA256.
    Sha256,
    /// HMAC-SHA1.
    Sha1,
}

impl DigestAlgorithm {
    /// Returns the digest output length in bytes.
    #[must_use]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha1 => 20,
        }
    }
}

/// The fixed signature scheme for a vendor category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureScheme {
    /// The digest algorithm.
    pub algorithm: DigestAlgorithm,
    /// The request header carrying the signature.
    pub header: &'static str,
    /// The prefix the header value must start with (e.g. `sha256=`).
    pub prefix: &'static str,
}

impl VendorKind {
    /// Returns the signature scheme for this vendor category.
    #[must_use]
    pub const fn signature_scheme(&self) -> SignatureScheme {
        match self {
            Self::Passage => SignatureScheme {
                algorithm: DigestAlgorithm::Sha256,
                header: "x-passage-signature",
                prefix: "sha256=",
            },
            Self::Lumen => SignatureScheme {
                algorithm: DigestAlgorithm::Sha1,
                header: "x-lumen-signature",
                prefix: "sha1=",
            },
        }
    }

    /// Returns the wire form of the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Passage => "passage",
            Self::Lumen => "lumen",
        }
    }
}

impl fmt::Display for VendorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VendorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passage" => Ok(Self::Passage),
            "lumen" => Ok(Self::Lumen),
            other => Err(Error::InvalidInput(format!(
                "unknown vendor category '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_mapping_is_fixed_per_vendor() {
        let passage = VendorKind::Passage.signature_scheme();
        assert_eq!(passage.algorithm, DigestAlgorithm::Sha256);
        assert_eq!(passage.prefix, "sha256=");
        assert_eq!(passage.header, "x-passage-signature");

        let lumen = VendorKind::Lumen.signature_scheme();
        assert_eq!(lumen.algorithm, DigestAlgorithm::Sha1);
        assert_eq!(lumen.prefix, "sha1=");
    }

    #[test]
    fn digest_lengths() {
        assert_eq!(DigestAlgorithm::Sha256.output_len(), 32);
        assert_eq!(DigestAlgorithm::Sha1.output_len(), 20);
    }

    #[test]
    fn unknown_category_fails_closed() {
        assert!("acme-cams".parse::<VendorKind>().is_err());
    }
}
