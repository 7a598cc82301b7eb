//! VK launch-parameter signature verification.
//!
//! When VK opens a Mini App it attaches a set of `vk_*` query parameters
//! describing the launching user and platform, plus a `sign` value: the
//! HMAC-SHA256 of the sorted, form-urlencoded `vk_*` pairs keyed with the app
//! secret, encoded as unpadded base64url. Recomputing that signature proves
//! the parameters were issued by VK and not tampered with.
//!
//! ## Canonicalization
//!
//! Signer and verifier must agree exactly: pairs are sorted by key with
//! byte-wise comparison, then form-urlencoded (`key=value&...`, space as `+`).
//! Insertion order of the incoming map is irrelevant.
//!
//! ## Encoding
//!
//! VK issues the signature in the base64url alphabet without padding. Only
//! that encoding is accepted here; an incoming signature in the standard
//! alphabet is normalized first. The final comparison is constant-time.

use crate::domain::types::{LaunchParams, VerifiedLaunch};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};

type HmacSha256 = Hmac<Sha256>;

/// Reserved key carrying the signature; excluded from the signed payload.
pub const SIGN_KEY: &str = "sign";

/// Namespace prefix of the signed launch parameters.
pub const VK_PREFIX: &str = "vk_";

/// Why a signature check failed. Used for logging and tests; callers that
/// only gate on the verdict use [`verify_launch_params`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyFailure {
    /// No parameters supplied at all
    EmptyParams,
    /// No `sign` entry in the parameter map
    MissingSignature,
    /// Server-side secret is not configured (deployment defect, not an attack)
    MissingSecret,
    /// No `vk_*` entries to sign
    NoVkParams,
    /// Recomputed signature does not match the attached one
    Mismatch,
}

/// Verify the signature over a launch-parameter map.
///
/// Returns `true` only if every check passes; all failure paths log and map
/// to `false`. Never panics on any input.
pub fn verify_launch_params(params: &LaunchParams, secret: &str) -> bool {
    match check_launch_params(params, secret) {
        Ok(()) => true,
        Err(VerifyFailure::MissingSecret) => {
            // Operational alarm: every request will fail until fixed.
            error!("VK signature check: app secret not configured");
            false
        }
        Err(failure) => {
            warn!(?failure, "VK signature check failed");
            false
        }
    }
}

/// Verification with the failure kind exposed.
pub fn check_launch_params(params: &LaunchParams, secret: &str) -> Result<(), VerifyFailure> {
    if params.is_empty() {
        return Err(VerifyFailure::EmptyParams);
    }

    let sign = params.get(SIGN_KEY).ok_or(VerifyFailure::MissingSignature)?;

    if secret.is_empty() {
        return Err(VerifyFailure::MissingSecret);
    }

    let payload = canonical_payload(params);
    if payload.is_empty() {
        return Err(VerifyFailure::NoVkParams);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| VerifyFailure::Mismatch)?;
    mac.update(payload.as_bytes());
    let computed = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    let provided = normalize_sign(sign);
    debug!(computed = %computed, provided = %provided, "VK signature comparison");

    if constant_time_eq(&computed, &provided) {
        Ok(())
    } else {
        Err(VerifyFailure::Mismatch)
    }
}

/// Extract the identity fields after a successful verification.
pub fn extract_identity(params: &LaunchParams) -> VerifiedLaunch {
    VerifiedLaunch {
        user_id: params.get("vk_user_id").cloned().unwrap_or_default(),
        app_id: params.get("vk_app_id").cloned().unwrap_or_default(),
        platform: params.get("vk_platform").cloned().unwrap_or_default(),
        params: params.clone(),
    }
}

/// Sorted, form-urlencoded `vk_*` pairs; the byte sequence that gets signed.
fn canonical_payload(params: &LaunchParams) -> String {
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .filter(|(k, _)| k.starts_with(VK_PREFIX) && k.as_str() != SIGN_KEY)
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Map a signature from the standard base64 alphabet into base64url and strip
/// padding, so clients that re-encode the value still compare correctly.
fn normalize_sign(sign: &str) -> String {
    sign.trim_end_matches('=')
        .replace('+', "-")
        .replace('/', "_")
}

/// Constant-time string comparison.
///
/// Both inputs are padded to the longer length with distinct fill bytes so a
/// length mismatch cannot short-circuit, then compared with `subtle`.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let max_len = std::cmp::max(a.len(), b.len());

    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "topsecret";

    /// Compute a valid signature the way the platform does.
    fn sign_params(params: &LaunchParams, secret: &str) -> String {
        let payload = canonical_payload(params);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn launch_params() -> LaunchParams {
        let mut params = LaunchParams::new();
        params.insert("vk_user_id".into(), "42".into());
        params.insert("vk_app_id".into(), "100".into());
        params.insert("vk_platform".into(), "mobile_android".into());
        let sign = sign_params(&params, SECRET);
        params.insert(SIGN_KEY.into(), sign);
        params
    }

    #[test]
    fn test_valid_signature() {
        assert!(verify_launch_params(&launch_params(), SECRET));
    }

    #[test]
    fn test_deterministic() {
        let params = launch_params();
        for _ in 0..3 {
            assert!(verify_launch_params(&params, SECRET));
        }
    }

    #[test]
    fn test_tampered_value_rejected() {
        let mut params = launch_params();
        params.insert("vk_user_id".into(), "43".into());
        assert_eq!(
            check_launch_params(&params, SECRET),
            Err(VerifyFailure::Mismatch)
        );
    }

    #[test]
    fn test_key_separation() {
        let params = launch_params();
        assert!(!verify_launch_params(&params, "othersecret"));
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        // Same pairs inserted in a different order verify identically because
        // canonicalization sorts by key.
        let reference = launch_params();
        let sign = reference.get(SIGN_KEY).unwrap().clone();

        let mut reordered = LaunchParams::new();
        reordered.insert("vk_platform".into(), "mobile_android".into());
        reordered.insert(SIGN_KEY.into(), sign);
        reordered.insert("vk_app_id".into(), "100".into());
        reordered.insert("vk_user_id".into(), "42".into());
        assert!(verify_launch_params(&reordered, SECRET));
    }

    #[test]
    fn test_empty_params() {
        assert_eq!(
            check_launch_params(&LaunchParams::new(), SECRET),
            Err(VerifyFailure::EmptyParams)
        );
    }

    #[test]
    fn test_missing_signature() {
        let mut params = LaunchParams::new();
        params.insert("vk_user_id".into(), "1".into());
        assert_eq!(
            check_launch_params(&params, SECRET),
            Err(VerifyFailure::MissingSignature)
        );
    }

    #[test]
    fn test_unconfigured_secret() {
        assert_eq!(
            check_launch_params(&launch_params(), ""),
            Err(VerifyFailure::MissingSecret)
        );
    }

    #[test]
    fn test_no_vk_params() {
        let mut params = LaunchParams::new();
        params.insert(SIGN_KEY.into(), "whatever".into());
        params.insert("odr_enabled".into(), "1".into());
        assert_eq!(
            check_launch_params(&params, SECRET),
            Err(VerifyFailure::NoVkParams)
        );
    }

    #[test]
    fn test_standard_alphabet_normalized() {
        let mut params = launch_params();
        let sign = params.get(SIGN_KEY).unwrap().clone();
        let standard = sign.replace('-', "+").replace('_', "/");
        params.insert(SIGN_KEY.into(), standard);
        assert!(verify_launch_params(&params, SECRET));
    }

    #[test]
    fn test_flip_one_character() {
        let mut params = launch_params();
        let mut sign = params.get(SIGN_KEY).unwrap().clone().into_bytes();
        sign[0] = if sign[0] == b'A' { b'B' } else { b'A' };
        params.insert(SIGN_KEY.into(), String::from_utf8(sign).unwrap());
        assert!(!verify_launch_params(&params, SECRET));
    }

    #[test]
    fn test_canonical_payload_sorted_and_encoded() {
        let mut params = LaunchParams::new();
        params.insert("vk_b".into(), "two words".into());
        params.insert("vk_a".into(), "1".into());
        params.insert(SIGN_KEY.into(), "x".into());
        assert_eq!(canonical_payload(&params), "vk_a=1&vk_b=two+words");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("secret", "secret"));
        assert!(!constant_time_eq("secret", "Secret"));
        assert!(!constant_time_eq("secret", "secre"));
        assert!(!constant_time_eq("secret", "secrets"));
    }

    #[test]
    fn test_extract_identity() {
        let identity = extract_identity(&launch_params());
        assert_eq!(identity.user_id, "42");
        assert_eq!(identity.app_id, "100");
        assert_eq!(identity.platform, "mobile_android");
        assert!(identity.params.contains_key(SIGN_KEY));
    }
}
