//! QR payload encoding
//!
//! ## Payload format
//! ```text
//! <collect_base_url>?binId=<humanCode>&autoSubmit=true
//! ```
//!
//! The payload is the exact string printed into the physical QR code and
//! persisted on the bin. Encoding is pure and idempotent: the same bin and
//! base URL always yield the same payload, and the human code round-trips
//! exactly through `extract_human_code`.
//!
//! ## Example
//! base=https://x/staff/collect, code=BIN42
//! → https://x/staff/collect?binId=BIN42&autoSubmit=true

use rand::Rng;
use url::Url;

/// Query parameter carrying the human code
const BIN_ID_PARAM: &str = "binId";

/// Human code length bounds
const HUMAN_CODE_MIN: usize = 3;
const HUMAN_CODE_MAX: usize = 32;

/// Generated code suffix length (BIN-XXXXXX)
const GENERATED_SUFFIX_LEN: usize = 6;

/// Alphabet for generated codes (no lowercase, avoids QR case ambiguity)
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ0123456789";

/// Build the QR payload for a bin
///
/// # Arguments
/// * `base_url` - collection URL the staff app serves (no query string)
/// * `human_code` - the bin's validated human code
///
/// # Returns
/// Ok: the exact payload string
/// Err: base URL unparseable
pub fn encode_qr_payload(base_url: &str, human_code: &str) -> Result<String, String> {
    let mut url = Url::parse(base_url).map_err(|e| format!("Invalid base URL: {}", e))?;

    url.query_pairs_mut()
        .clear()
        .append_pair(BIN_ID_PARAM, human_code)
        .append_pair("autoSubmit", "true");

    Ok(url.to_string())
}

/// Extract the human code from a scanned string, when it is the URL form
///
/// Returns None for anything that does not parse as a URL carrying a
/// `binId` parameter; the caller then treats the input as a bare code.
pub fn extract_human_code(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == BIN_ID_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Validate a caller-supplied human code
///
/// Uppercase alphanumerics and `-`, length 3..=32. Codes are printed on
/// physical labels, so the charset stays visually unambiguous.
pub fn validate_human_code(code: &str) -> Result<(), String> {
    if code.len() < HUMAN_CODE_MIN || code.len() > HUMAN_CODE_MAX {
        return Err(format!(
            "Human code length must be {}..={}, got {}",
            HUMAN_CODE_MIN,
            HUMAN_CODE_MAX,
            code.len()
        ));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(format!(
            "Human code must be uppercase alphanumeric or '-': {}",
            code
        ));
    }

    Ok(())
}

/// Generate a fresh human code (BIN-XXXXXX)
///
/// Uniqueness is the registry's responsibility; this only draws the
/// candidate.
pub fn generate_human_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..GENERATED_SUFFIX_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();

    format!("BIN-{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_exact_format() {
        let payload = encode_qr_payload("https://x/staff/collect", "BIN42").unwrap();
        assert_eq!(payload, "https://x/staff/collect?binId=BIN42&autoSubmit=true");
    }

    #[test]
    fn test_encode_idempotent() {
        let a = encode_qr_payload("https://x/staff/collect", "BIN-A1B2C3").unwrap();
        let b = encode_qr_payload("https://x/staff/collect", "BIN-A1B2C3").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_invalid_base() {
        assert!(encode_qr_payload("not a url", "BIN42").is_err());
    }

    #[test]
    fn test_roundtrip_through_payload() {
        let payload = encode_qr_payload("https://x/staff/collect", "BIN-7Q2XWZ").unwrap();
        assert_eq!(extract_human_code(&payload).as_deref(), Some("BIN-7Q2XWZ"));
    }

    #[test]
    fn test_extract_from_bare_code_is_none() {
        assert!(extract_human_code("BIN42").is_none());
    }

    #[test]
    fn test_extract_url_without_bin_id_is_none() {
        assert!(extract_human_code("https://x/staff/collect?foo=1").is_none());
    }

    #[test]
    fn test_validate_accepts_generated() {
        for _ in 0..20 {
            let code = generate_human_code();
            assert!(validate_human_code(&code).is_ok(), "generated {}", code);
        }
    }

    #[test]
    fn test_validate_rejects_lowercase() {
        assert!(validate_human_code("bin42").is_err());
    }

    #[test]
    fn test_validate_rejects_short_and_long() {
        assert!(validate_human_code("AB").is_err());
        assert!(validate_human_code(&"X".repeat(33)).is_err());
    }

    #[test]
    fn test_generated_codes_have_expected_shape() {
        let code = generate_human_code();
        assert!(code.starts_with("BIN-"));
        assert_eq!(code.len(), 4 + 6);
    }
}
