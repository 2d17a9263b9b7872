//! Signed session cookie codec
//!
//! Login state is a stateless signed cookie rather than a server-side
//! session table. The cookie value is
//!
//! ```text
//! base64url(json payload) "." base64url(hmac-sha256(secret, payload))
//! ```
//!
//! where the payload carries the user's id, email, display name and an
//! expiry timestamp. Verification recomputes the MAC over the received
//! payload bytes (constant-time comparison via `Mac::verify_slice`) and then
//! checks the expiry; any malformed, tampered or expired token is treated as
//! "not logged in".

use chrono::Utc;
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::models::User;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Session lifetime: 7 days
pub const SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// The authenticated identity carried in the cookie payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    /// User ID
    pub uid: i64,
    /// Email address
    pub email: String,
    /// Display name
    pub name: String,
    /// Expiry as unix timestamp (seconds)
    pub exp: i64,
}

/// Signs and verifies session cookies with a server-side secret.
pub struct SessionKey {
    secret: Vec<u8>,
}

impl SessionKey {
    /// Create a signing key from the configured secret.
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Issue a signed token for the given user, valid for
    /// [`SESSION_TTL_SECONDS`] from now.
    pub fn sign(&self, user: &User) -> String {
        let payload = SessionUser {
            uid: user.id,
            email: user.email.clone(),
            name: user.full_name.clone(),
            exp: Utc::now().timestamp() + SESSION_TTL_SECONDS,
        };
        self.sign_payload(&payload)
    }

    fn sign_payload(&self, payload: &SessionUser) -> String {
        // Serialization of a plain struct cannot fail
        let payload_bytes = serde_json::to_vec(payload).expect("session payload serialization");

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(&payload_bytes);
        let tag = mac.finalize().into_bytes();

        format!(
            "{}.{}",
            BASE64URL_NOPAD.encode(&payload_bytes),
            BASE64URL_NOPAD.encode(&tag)
        )
    }

    /// Verify a token and return the identity it carries.
    ///
    /// Returns None for anything that does not check out: wrong shape, bad
    /// base64, bad MAC, unparsable payload, or an expired session.
    pub fn verify(&self, token: &str) -> Option<SessionUser> {
        let (payload_b64, tag_b64) = token.split_once('.')?;

        let payload_bytes = BASE64URL_NOPAD.decode(payload_b64.as_bytes()).ok()?;
        let tag = BASE64URL_NOPAD.decode(tag_b64.as_bytes()).ok()?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(&payload_bytes);
        mac.verify_slice(&tag).ok()?;

        let session: SessionUser = serde_json::from_slice(&payload_bytes).ok()?;
        if session.exp <= Utc::now().timestamp() {
            return None;
        }

        Some(session)
    }
}
