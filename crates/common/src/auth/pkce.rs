//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 with the `S256` method. Verifiers and state nonces are
//! drawn from the OS random source over the unreserved URI alphabet, so they
//! can be placed in a query string without escaping.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};

/// RFC 7636 unreserved characters: `[A-Z] / [a-z] / [0-9] / "-" / "." / "_" / "~"`
pub const UNRESERVED_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Length of generated verifiers and state nonces (the RFC 7636 minimum).
pub const DEFAULT_RANDOM_LENGTH: usize = 43;

/// The only challenge method this client sends.
pub const CHALLENGE_METHOD: &str = "S256";

/// Generate a random string of `length` unreserved characters.
///
/// Each character is sampled uniformly from [`UNRESERVED_ALPHABET`] using
/// the operating system's CSPRNG.
#[must_use]
pub fn random_string(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(UNRESERVED_ALPHABET[rng.gen_range(0..UNRESERVED_ALPHABET.len())]))
        .collect()
}

/// Generate a cryptographically secure code verifier (43 characters).
#[must_use]
pub fn generate_code_verifier() -> String {
    random_string(DEFAULT_RANDOM_LENGTH)
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier))),
/// without padding.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random state token for CSRF protection
#[must_use]
pub fn generate_state() -> String {
    random_string(DEFAULT_RANDOM_LENGTH)
}

/// Validate that the state echoed by the authorization server matches.
///
/// Strict byte equality, evaluated in constant time for equal-length inputs.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    constant_time_eq(expected.as_bytes(), actual.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

/// PKCE parameters for a single authorization attempt
///
/// Created at the start of a sign-in and dropped at its end. The verifier is
/// kept in memory only and sent once, in the token exchange.
#[derive(Clone)]
pub struct PkceChallenge {
    /// Random secret sent during token exchange
    pub code_verifier: String,

    /// SHA256 hash of code_verifier (base64url encoded)
    /// Sent in authorization request for server validation
    pub code_challenge: String,

    /// Random CSRF protection token
    /// Must match between authorization request and callback
    pub state: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge with cryptographically secure random
    /// values
    ///
    /// # Examples
    /// ```
    /// use forceauth_common::auth::pkce::PkceChallenge;
    ///
    /// let challenge = PkceChallenge::generate();
    /// assert_eq!(challenge.code_verifier.len(), 43);
    /// assert_eq!(challenge.challenge_method(), "S256");
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        let state = generate_state();

        Self { code_verifier, code_challenge, state }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("code_verifier", &"[REDACTED]")
            .field("code_challenge", &self.code_challenge)
            .field("state", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::pkce.
    use super::*;

    /// Validates `random_string` behavior for the alphabet and length
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms every requested length is honoured.
    /// - Ensures every character belongs to the unreserved alphabet.
    #[test]
    fn test_random_string_alphabet_and_length() {
        for length in [0, 1, 16, 43, 128] {
            let value = random_string(length);
            assert_eq!(value.len(), length);
            assert!(value.bytes().all(|b| UNRESERVED_ALPHABET.contains(&b)), "{value}");
        }
    }

    /// Validates `PkceChallenge::generate` behavior for the unique challenges
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms verifiers, challenges and states differ between calls.
    #[test]
    fn test_unique_challenges() {
        let challenge1 = PkceChallenge::generate();
        let challenge2 = PkceChallenge::generate();

        assert_ne!(challenge1.code_verifier, challenge2.code_verifier);
        assert_ne!(challenge1.code_challenge, challenge2.code_challenge);
        assert_ne!(challenge1.state, challenge2.state);
    }

    /// Validates `generate_code_challenge` against the RFC 7636 appendix B
    /// example.
    ///
    /// Assertions:
    /// - Confirms the challenge equals the published value.
    #[test]
    fn test_code_challenge_rfc_vector() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            generate_code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    /// Validates `PkceChallenge::generate` behavior for the code challenge
    /// deterministic scenario.
    ///
    /// Assertions:
    /// - Confirms the bundled challenge is recomputable from the verifier.
    /// - Ensures the challenge has no padding and is 43 characters long.
    #[test]
    fn test_code_challenge_deterministic() {
        let challenge = PkceChallenge::generate();

        assert_eq!(challenge.code_challenge, generate_code_challenge(&challenge.code_verifier));
        assert_eq!(challenge.code_challenge.len(), 43);
        assert!(!challenge.code_challenge.contains('='));
        assert!(!challenge.code_challenge.contains('+'));
        assert!(!challenge.code_challenge.contains('/'));
    }

    /// Validates `validate_state` behavior for matching and tampered inputs.
    ///
    /// Assertions:
    /// - Ensures identical states validate.
    /// - Ensures a different state, a prefix and an empty state are rejected.
    #[test]
    fn test_validate_state() {
        let state = generate_state();
        assert!(validate_state(&state, &state.clone()));
        assert!(!validate_state(&state, "WRONG"));
        assert!(!validate_state(&state, &state[..42]));
        assert!(!validate_state(&state, ""));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let challenge = PkceChallenge::generate();
        let debug = format!("{challenge:?}");
        assert!(!debug.contains(&challenge.code_verifier));
        assert!(!debug.contains(&challenge.state));
    }
}
