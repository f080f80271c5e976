//! HMAC request signing for platform API calls
//!
//! Mutating requests carry an HMAC-SHA256 signature over the compact JSON
//! body so a nucleus can verify the payload was produced by a holder of the
//! shared secret.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Signs request bodies with a shared secret.
pub struct RequestSigner {
    secret: SecretString,
}

impl RequestSigner {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Hex-encoded HMAC-SHA256 signature of the payload.
    pub fn signature(&self, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(payload);
        let bytes = mac.finalize().into_bytes();
        bytes.as_slice().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").finish_non_exhaustive()
    }
}
