//! Random token generation
//!
//! Session ids, CSRF tokens and OAuth state values all come from here.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};

use crate::error::AppError;

/// Entropy of an OAuth state value
pub const STATE_TOKEN_BYTES: usize = 16;

/// Entropy of a session id or CSRF token
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Generate an unguessable URL-safe token
///
/// Reads `byte_length` bytes from the operating system's secure random
/// source and encodes them as unpadded base64url, so the result is always
/// `ceil(4 * byte_length / 3)` characters long.
///
/// # Errors
/// Returns `AppError::TokenGeneration` if `byte_length` is zero or the
/// random source is unavailable.
pub fn random_token(byte_length: usize) -> Result<String, AppError> {
    if byte_length == 0 {
        return Err(AppError::TokenGeneration(
            "token length must be greater than 0".to_string(),
        ));
    }

    let mut bytes = vec![0_u8; byte_length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AppError::TokenGeneration(e.to_string()))?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
