//! Endpoint authentication
//!
//! Three mutually exclusive modes, each rendering one `Authorization` header:
//! - Basic: the literal `Basic #<user>:#<pass>` (not RFC 7617 base64)
//! - Bearer: a pre-shared token sent verbatim
//! - JWT: an HS256 token over caller claims, with `exp` defaulted to now+3600s

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{json, Map, Value};
use sha2::Sha256;

use contracts::PubControlError;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime given to tokens whose claims carry no `exp`
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// JWT claim set
pub type Claims = Map<String, Value>;

/// Configured auth mode of one endpoint
#[derive(Clone, Default)]
pub enum AuthMode {
    #[default]
    None,
    Basic {
        user: String,
        pass: String,
    },
    Bearer {
        token: String,
    },
    Jwt {
        claims: Claims,
        key: Vec<u8>,
    },
}

impl AuthMode {
    /// Short label for logs and listings
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
            Self::Jwt { .. } => "jwt",
        }
    }

    /// Render the `Authorization` header value
    ///
    /// Returns an empty string when no auth is configured.
    ///
    /// # Errors
    /// `Signing` if the JWT key or claims are rejected
    pub fn header(&self) -> Result<String, PubControlError> {
        match self {
            Self::None => Ok(String::new()),
            Self::Basic { user, pass } => Ok(format!("Basic #{user}:#{pass}")),
            Self::Bearer { token } => Ok(format!("Bearer {token}")),
            Self::Jwt { claims, key } => {
                let token = sign_hs256(claims, key, Utc::now().timestamp())?;
                Ok(format!("Bearer {token}"))
            }
        }
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { user, .. } => f.debug_struct("Basic").field("user", user).finish(),
            Self::Bearer { .. } => f.write_str("Bearer"),
            Self::Jwt { claims, .. } => f.debug_struct("Jwt").field("claims", claims).finish(),
        }
    }
}

/// Sign `claims` into a compact HS256 JWT
///
/// `now` is epoch seconds; `exp` is set to `now + 3600` unless present.
///
/// # Errors
/// `Signing` on empty key material or unencodable claims
pub fn sign_hs256(claims: &Claims, key: &[u8], now: i64) -> Result<String, PubControlError> {
    if key.is_empty() {
        return Err(PubControlError::signing("empty HS256 key"));
    }

    let mut claims = claims.clone();
    if !claims.contains_key("exp") {
        claims.insert("exp".to_string(), json!(now + DEFAULT_TOKEN_TTL_SECS));
    }

    let header = json!({"alg": "HS256", "typ": "JWT"});
    let header = serde_json::to_vec(&header)
        .map_err(|e| PubControlError::signing(format!("header encode: {e}")))?;
    let payload = serde_json::to_vec(&claims)
        .map_err(|e| PubControlError::signing(format!("claims encode: {e}")))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    );

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| PubControlError::signing(format!("invalid key: {e}")))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}
