mod signatures;

pub use signatures::{payment_signature_payload, sign_payload, verify_signature};
