//! HMAC-SHA256 signature verification for Drive/Admin webhook requests.
//!
//! The teacher's own stack has no signature-verification code — this is a
//! pack-wide enrichment (the `hmac`+`sha2` dependency choice follows
//! `examples/EffortlessMetrics-shipper/crates/shipper-webhook`'s webhook
//! stack, even though that crate's own handler never ends up hashing
//! anything).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verify `signature_hex` (lowercase hex HMAC-SHA256 of `body` under
/// `secret`) in constant time. Malformed hex is treated as a mismatch, not
/// an error — an attacker gains nothing from distinguishing the two.
pub fn verify_hmac_sha256(secret: &[u8], signature_hex: &str, body: &[u8]) -> bool {
    let Ok(expected_bytes) = hex_decode(signature_hex) else { return false };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    computed.ct_eq(&expected_bytes).into()
}

fn hex_decode(s: &str) -> Result<Vec<u8>, ()> {
    if s.len() % 2 != 0 {
        return Err(());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &[u8], body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(body);
        mac.finalize().into_bytes().iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn accepts_correctly_signed_body() {
        let secret = b"shh";
        let body = b"{\"resourceId\":\"abc\"}";
        let signature = sign(secret, body);
        assert!(verify_hmac_sha256(secret, &signature, body));
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = b"payload";
        let signature = sign(b"correct", body);
        assert!(!verify_hmac_sha256(b"wrong", &signature, body));
    }

    #[test]
    fn rejects_tampered_body() {
        let secret = b"shh";
        let signature = sign(secret, b"original");
        assert!(!verify_hmac_sha256(secret, &signature, b"tampered"));
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(!verify_hmac_sha256(b"shh", "not-hex!!", b"body"));
    }
}
