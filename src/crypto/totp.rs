//! RFC 6238 TOTP second factor.
//!
//! HMAC-SHA1, 6 digits, 30-second steps. Verification accepts the
//! current step and one step either side to tolerate clock skew. The
//! verifier is stateless: there is no attempt counter at this layer.

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::errors::{Result, VaultError};

/// Time step in seconds.
pub const PERIOD_SECS: u64 = 30;

/// Steps accepted on either side of the current one.
pub const SKEW_STEPS: u64 = 1;

/// Number of digits in a code.
pub const DIGITS: usize = 6;

/// Length of a freshly generated shared secret (160 bits, as RFC 4226 recommends).
const SECRET_LEN: usize = 20;

/// Generate a new random shared secret, base32-encoded without padding.
pub fn generate_secret() -> String {
    let mut raw = [0u8; SECRET_LEN];
    rand::rng().fill_bytes(&mut raw);
    BASE32_NOPAD.encode(&raw)
}

/// Structural check: exactly six ASCII digits.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

/// Generate the code for the step containing `unix_secs`.
pub fn generate(secret: &str, unix_secs: u64) -> Result<String> {
    let key = decode_secret(secret)?;
    Ok(hotp(&key, unix_secs / PERIOD_SECS))
}

/// Verify `code` against `secret` at `unix_secs`, accepting ±1 step.
///
/// Malformed secrets or codes simply fail verification.
pub fn verify(secret: &str, code: &str, unix_secs: u64) -> bool {
    if !is_well_formed(code) {
        return false;
    }
    let Ok(key) = decode_secret(secret) else {
        return false;
    };

    let step = unix_secs / PERIOD_SECS;
    let start = step.saturating_sub(SKEW_STEPS);
    let end = step.saturating_add(SKEW_STEPS);

    // Check every step in the window; no early exit.
    let mut valid = false;
    for counter in start..=end {
        let expected = hotp(&key, counter);
        if bool::from(expected.as_bytes().ct_eq(code.as_bytes())) {
            valid = true;
        }
    }
    valid
}

/// Seconds until the current code rolls over.
pub fn seconds_remaining(unix_secs: u64) -> u64 {
    PERIOD_SECS - (unix_secs % PERIOD_SECS)
}

/// Build an `otpauth://` URI for authenticator apps.
pub fn provisioning_uri(secret: &str, account: &str, issuer: &str) -> String {
    format!(
        "otpauth://totp/{issuer}:{account}?secret={secret}&issuer={issuer}&algorithm=SHA1&digits={DIGITS}&period={PERIOD_SECS}",
        issuer = percent_encode(issuer),
        account = percent_encode(account),
    )
}

fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let key = BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|_| VaultError::ConfigError("TOTP secret is not valid base32".into()))?;
    if key.is_empty() {
        return Err(VaultError::ConfigError("TOTP secret is empty".into()));
    }
    Ok(key)
}

/// RFC 4226 HOTP with dynamic truncation.
fn hotp(key: &[u8], counter: u64) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match Hmac::<Sha1>::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = usize::from(digest[digest.len() - 1] & 0x0F);
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7F,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    format!("{:0width$}", binary % 1_000_000, width = DIGITS)
}

fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'@') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
