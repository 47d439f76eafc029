//! `company_id_token` turns numeric company IDs into opaque, UUID-shaped tokens for use in
//! URLs, and turns them back.
//!
//! Raw database IDs are sequential, so exposing them invites enumeration. This crate
//! encrypts the ID instead: the ID is written big-endian into the second half of a
//! 16 byte block, the block is encrypted with AES-128 (single block, no IV, no padding),
//! and the ciphertext is shown as a canonical lowercase UUID string.  Decoding reverses
//! the steps and checks that the zero half survived, so a token minted under a different
//! key, or a random UUID, is rejected rather than decoded into a bogus ID.
//!
//! The cipher key is the first 16 bytes of SHA-256 over a configured secret, normally
//! taken from the `COMPANY_ID_ENCRYPTION_KEY` environment variable.  Without it a fixed
//! development secret is used, which is public and **must not** be used in production;
//! see [`Config::require_configured`].
//!
//! Tokens carry no version tag.  Changing the secret, the cipher, the key derivation or
//! the block layout silently invalidates every token already handed out, including
//! bookmarked links.
//!
//! IDs are limited to [`MAX_COMPANY_ID`] (2^53 - 1) so that every ID survives a trip
//! through JavaScript numbers.
//!
//! # Usage
//!
//! ```
//! use company_id_token::{Codec, Config};
//!
//! let codec = Codec::new(&Config::new(b"your-secure-key"));
//! let token = codec.encode(12345).unwrap();
//! assert_eq!(codec.decode(&token), Some(12345));
//!
//! // Malformed or foreign input is simply absent.
//! assert_eq!(codec.decode("00000000-0000-0000-0000-000000000000"), None);
//! ```
//!
//! In an application, build the codec once at startup and keep it in shared state:
//!
//! ```no_run
//! use company_id_token::{Codec, Config};
//!
//! let config = Config::from_env().require_configured().expect("company ID secret");
//! let codec = Codec::new(&config);
//! # let _ = codec;
//! ```

mod codec;
mod config;
mod id;
mod token;

pub use codec::{Codec, Error};
pub use config::{Config, ConfigError, KeySource, DEVELOPMENT_SECRET, ENV_VAR};
pub use id::{CompanyId, MAX_COMPANY_ID};
pub use token::{CompanyIdToken, TOKEN_LENGTH};

/// Encodes `company_id` with `codec`. Fails with `Error::InvalidInput` when the ID is
/// out of range.
pub fn encode_company_id_token(codec: &Codec, company_id: u64) -> Result<String, Error> {
    codec.encode(company_id)
}

/// Decodes `token` with `codec`, returning `None` for anything that is not a valid token.
pub fn decode_company_id_token(codec: &Codec, token: &str) -> Option<u64> {
    codec.decode(token)
}
