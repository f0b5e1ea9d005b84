//! Vendor webhook signature verification.
//!
//! Each vendor category signs the raw request body with an HMAC whose
//! digest algorithm and header prefix are fixed by
//! [`VendorKind::signature_scheme`]. Verification recomputes the digest
//! over the exact bytes received — before any JSON parsing — and compares
//! in constant time.
//!
//! Every failure collapses into the same [`SignatureError`]: callers must
//! not be able to tell a malformed header from a digest mismatch.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use warden_core::vendor::{DigestAlgorithm, VendorKind};

/// Uniform verification failure.
///
/// Deliberately carries no cause: missing secret, malformed header, and
/// digest mismatch are indistinguishable to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("webhook signature verification failed")]
pub struct SignatureError;

/// Verifies a vendor signature header against the raw request body.
///
/// The header value must carry the vendor's fixed prefix (`sha256=` /
/// `sha1=`) followed by the hex digest. A length mismatch between the
/// provided and computed digests is itself a verification failure,
/// checked before the constant-time comparison.
///
/// # Errors
///
/// Returns [`SignatureError`] on any failure, with no further detail.
pub fn verify_signature(
    vendor: VendorKind,
    secret: &[u8],
    body: &[u8],
    header_value: &str,
) -> Result<(), SignatureError> {
    let scheme = vendor.signature_scheme();
    let provided_hex = header_value
        .strip_prefix(scheme.prefix)
        .ok_or(SignatureError)?;
    let provided = hex::decode(provided_hex).map_err(|_| SignatureError)?;

    let computed = compute_digest(scheme.algorithm, secret, body)?;

    if provided.len() != computed.len() {
        return Err(SignatureError);
    }
    if bool::from(provided.as_slice().ct_eq(computed.as_slice())) {
        Ok(())
    } else {
        Err(SignatureError)
    }
}

/// Computes the signature header value a vendor would send for `body`.
///
/// Used by tests and by local delivery tooling.
///
/// # Errors
///
/// Returns [`SignatureError`] if the MAC cannot be keyed.
pub fn sign(vendor: VendorKind, secret: &[u8], body: &[u8]) -> Result<String, SignatureError> {
    let scheme = vendor.signature_scheme();
    let digest = compute_digest(scheme.algorithm, secret, body)?;
    Ok(format!("{}{}", scheme.prefix, hex::encode(digest)))
}

fn compute_digest(
    algorithm: DigestAlgorithm,
    secret: &[u8],
    body: &[u8],
) -> Result<Vec<u8>, SignatureError> {
    match algorithm {
        DigestAlgorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| SignatureError)?;
            mac.update(body);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        DigestAlgorithm::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(secret).map_err(|_| SignatureError)?;
            mac.update(body);
            Ok(mac.finalize().into_bytes().to_vec())
        }
    }
}
