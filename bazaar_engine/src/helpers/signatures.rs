//! HMAC signature helpers for the payment gateway.
//!
//! Two signatures exist in the system, both HMAC-SHA256 with a shared secret, hex-encoded:
//! * webhook deliveries are signed over the exact raw request body;
//! * client-side payment verification signs the canonical string
//!   `"{gateway_order_id}|{payment_id}"`.
//!
//! Verification must be constant-time, so it goes through [`hmac::Mac::verify_slice`] rather
//! than a string comparison.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex-encoded HMAC-SHA256 signature over `payload`.
pub fn verify_signature(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload);
    mac.verify_slice(&signature).is_ok()
}

/// The canonical string a client signs when reporting a completed payment.
pub fn payment_signature_payload(gateway_order_id: &str, payment_id: &str) -> String {
    format!("{gateway_order_id}|{payment_id}")
}
