use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Block};
use thiserror::Error;
use uuid::Uuid;

use crate::config::DerivedKey;
use crate::{CompanyId, CompanyIdToken, Config};

/// Error returned for encode/decode errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid company ID: {reason}")]
    InvalidInput { reason: String },
    #[error("Token is not a canonical UUID string")]
    MalformedToken,
    #[error("Decrypted padding is not zero")]
    PaddingMismatch,
    #[error("Decoded value {value} exceeds the maximum company ID")]
    OutOfRange { value: u64 },
}

// One AES block.
const BLOCK_SIZE: usize = 16;

// The ID occupies the second half of the block, big-endian; the first half is zero.
const ID_OFFSET: usize = 8;

/// Core encoder/decoder.
///
/// The key schedule is computed once in `new`. Build one `Codec` per process
/// and share it; encoding and decoding take `&self` and need no locking.
#[derive(Clone)]
pub struct Codec {
    cipher: Aes128,
}

impl Codec {
    /// Creates a new `Codec` keyed from `config`.
    ///
    /// # Examples
    ///
    /// ```
    /// use company_id_token::{Codec, Config};
    ///
    /// let codec = Codec::new(&Config::new(b"your-secure-key"));
    /// ```
    pub fn new(config: &Config) -> Codec {
        Self::from_key(&config.derive_key())
    }

    fn from_key(key: &DerivedKey) -> Codec {
        Codec {
            cipher: Aes128::new(&GenericArray::from(key.0)),
        }
    }

    /// Encodes `id` into a lowercase, hyphenated UUID string.
    ///
    /// Fails with `Error::InvalidInput` if `id` exceeds `MAX_COMPANY_ID`.
    ///
    /// # Examples
    ///
    /// ```
    /// use company_id_token::{Codec, Config};
    ///
    /// let codec = Codec::new(&Config::new(b"Test key here"));
    /// let encoded = codec.encode(42).unwrap();
    ///
    /// assert_eq!(encoded, "3e9c42f2-e0e8-73c2-6d0a-9b63762cfa4b");
    /// ```
    pub fn encode(&self, id: u64) -> Result<String, Error> {
        let id = CompanyId::try_from(id)?;
        Ok(self.encode_id(id).to_string())
    }

    /// Encodes an already validated `id`.
    pub fn encode_id(&self, id: CompanyId) -> CompanyIdToken {
        CompanyIdToken::from_bytes(self.encrypt_id(id))
    }

    /// Encodes `id` into a `Uuid` carrying the same bytes as `encode`.
    pub fn encode_uuid(&self, id: u64) -> Result<Uuid, Error> {
        let id = CompanyId::try_from(id)?;
        Ok(Uuid::from_bytes(self.encrypt_id(id)))
    }

    /// Decodes a token back into its company ID.
    ///
    /// Returns `None` for anything that is not a token issued under this key:
    /// malformed strings, foreign tokens and out-of-range values alike.
    ///
    /// # Examples
    ///
    /// ```
    /// use company_id_token::{Codec, Config};
    ///
    /// let codec = Codec::new(&Config::new(b"Test key here"));
    ///
    /// assert_eq!(codec.decode("3e9c42f2-e0e8-73c2-6d0a-9b63762cfa4b"), Some(42));
    /// assert_eq!(codec.decode("not-a-token"), None);
    /// ```
    pub fn decode(&self, encoded: &str) -> Option<u64> {
        self.try_decode(encoded).ok()
    }

    /// Like `decode`, but reports why a token was rejected.
    pub fn try_decode(&self, encoded: &str) -> Result<u64, Error> {
        let result = CompanyIdToken::parse(encoded).and_then(|token| self.decrypt_token(&token));
        if let Err(ref err) = result {
            tracing::trace!(error = %err, "rejected company ID token");
        }
        result.map(CompanyId::get)
    }

    /// Decodes an already parsed token.
    pub fn decode_token(&self, token: &CompanyIdToken) -> Option<CompanyId> {
        self.decrypt_token(token).ok()
    }

    /// Decodes a token held as a `Uuid`.
    pub fn decode_uuid(&self, uuid: &Uuid) -> Option<u64> {
        self.decode_token(&CompanyIdToken::from(*uuid))
            .map(CompanyId::get)
    }

    /// Resolves a URL parameter that may be either a token or a plain decimal ID.
    ///
    /// Tokens are tried first. Links minted before IDs were encoded keep working
    /// through the plain fallback.
    ///
    /// ```
    /// use company_id_token::{Codec, Config};
    ///
    /// let codec = Codec::new(&Config::new(b"Test key here"));
    ///
    /// let from_token = codec.resolve("3e9c42f2-e0e8-73c2-6d0a-9b63762cfa4b");
    /// let from_plain = codec.resolve("42");
    /// assert_eq!(from_token, from_plain);
    /// assert_eq!(codec.resolve("forty-two"), None);
    /// ```
    pub fn resolve(&self, param: &str) -> Option<CompanyId> {
        match CompanyIdToken::parse(param) {
            Ok(token) => self.decode_token(&token),
            Err(_) => param.parse().ok(),
        }
    }

    fn encrypt_id(&self, id: CompanyId) -> [u8; BLOCK_SIZE] {
        let mut block = Block::from(plaintext_block(id));
        self.cipher.encrypt_block(&mut block);
        block.into()
    }

    fn decrypt_token(&self, token: &CompanyIdToken) -> Result<CompanyId, Error> {
        let mut block = Block::from(*token.as_bytes());
        self.cipher.decrypt_block(&mut block);
        id_from_block(&block.into())
    }
}

fn plaintext_block(id: CompanyId) -> [u8; BLOCK_SIZE] {
    let mut bytes = [0u8; BLOCK_SIZE];
    bytes[ID_OFFSET..].copy_from_slice(&id.get().to_be_bytes());
    bytes
}

fn id_from_block(bytes: &[u8; BLOCK_SIZE]) -> Result<CompanyId, Error> {
    let (padding, id_bytes) = bytes.split_at(ID_OFFSET);
    if padding.iter().any(|&b| b != 0) {
        return Err(Error::PaddingMismatch);
    }
    let mut arr = [0u8; 8];
    arr.copy_from_slice(id_bytes);
    let value = u64::from_be_bytes(arr);
    CompanyId::new(value).ok_or(Error::OutOfRange { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_COMPANY_ID;
    use rand::{distributions::Uniform, Rng};

    fn test_codec() -> Codec {
        Codec::new(&Config::new(b"Test key here"))
    }

    fn is_canonical_lowercase(s: &str) -> bool {
        s.len() == 36
            && s.char_indices().all(|(i, c)| match i {
                8 | 13 | 18 | 23 => c == '-',
                _ => matches!(c, '0'..='9' | 'a'..='f'),
            })
    }

    #[test]
    fn test_known_tokens() {
        let codec = test_codec();
        let test_cases = [
            (0, "5d4f7195-f899-9b58-17d9-98059cd9aa23"),
            (1, "566bc0cb-f43a-d66f-1f88-9e153eb66cad"),
            (2, "a501ff29-f3d4-b77f-7c7e-2e247be8b78f"),
            (42, "3e9c42f2-e0e8-73c2-6d0a-9b63762cfa4b"),
            (123, "098a497c-70d8-b8c7-99bd-12394b51dcc0"),
            (12345, "7dd6917a-fdde-1396-a307-07510e5892ed"),
            (MAX_COMPANY_ID, "7f77f7c8-2de7-86c1-ed50-bbfdfc41585c"),
        ];

        for (input, expected) in test_cases {
            assert_eq!(codec.encode(input).unwrap(), expected);
            assert_eq!(codec.decode(expected), Some(input));
        }
    }

    #[test]
    fn test_development_key_token() {
        let codec = Codec::new(&Config::from_lookup(|_| None));
        assert_eq!(
            codec.encode(42).unwrap(),
            "1bc7bac3-bc3e-8efa-4eb8-9f39252f6a41"
        );
    }

    #[test]
    fn test_uuid() {
        let codec = test_codec();
        let uuid = codec.encode_uuid(42).unwrap();
        assert_eq!(
            uuid,
            Uuid::parse_str("3e9c42f2-e0e8-73c2-6d0a-9b63762cfa4b").unwrap()
        );
        assert_eq!(codec.decode_uuid(&uuid), Some(42));
        assert_eq!(codec.decode_uuid(&Uuid::nil()), None);
        assert!(matches!(
            codec.encode_uuid(MAX_COMPANY_ID + 1),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_typed_api() {
        let codec = test_codec();
        let id = CompanyId::new(12345).unwrap();
        let token = codec.encode_id(id);
        assert_eq!(token.to_string(), codec.encode(12345).unwrap());
        assert_eq!(codec.decode_token(&token), Some(id));
    }

    #[test]
    fn test_deterministic_and_canonical() {
        let codec = test_codec();
        for id in [0, 1, 42, 1 << 32, MAX_COMPANY_ID] {
            let first = codec.encode(id).unwrap();
            assert_eq!(first, codec.encode(id).unwrap());
            assert!(is_canonical_lowercase(&first), "bad format: {}", first);
        }
    }

    #[test]
    fn test_boundary() {
        let codec = test_codec();
        let token = codec.encode(MAX_COMPANY_ID).unwrap();
        assert_eq!(codec.decode(&token), Some(MAX_COMPANY_ID));
        assert!(matches!(
            codec.encode(MAX_COMPANY_ID + 1),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            codec.encode(u64::MAX),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_decode_errors() {
        let codec = test_codec();

        assert_eq!(codec.try_decode(""), Err(Error::MalformedToken));
        assert_eq!(codec.try_decode("not-a-token"), Err(Error::MalformedToken));
        assert_eq!(
            codec.try_decode("3e9c42f2e0e873c26d0a9b63762cfa4b"),
            Err(Error::MalformedToken)
        );

        // Valid syntax, but not produced under this key.
        assert_eq!(
            codec.try_decode("00000000-0000-0000-0000-000000000000"),
            Err(Error::PaddingMismatch)
        );
        assert_eq!(codec.decode("00000000-0000-0000-0000-000000000000"), None);

        // Tampering with any part breaks the padding.
        assert_eq!(
            codec.try_decode("3e9c42f2-e0e8-73c2-6d0a-9b63762cfa4c"),
            Err(Error::PaddingMismatch)
        );
        assert_eq!(
            codec.try_decode("4e9c42f2-e0e8-73c2-6d0a-9b63762cfa4b"),
            Err(Error::PaddingMismatch)
        );

        // Case does not matter on input.
        assert_eq!(
            codec.try_decode("3E9C42F2-E0E8-73C2-6D0A-9B63762CFA4B"),
            Ok(42)
        );
    }

    #[test]
    fn test_out_of_range_block() {
        // A block with zero padding but a value past the bound.
        let mut bytes = [0u8; BLOCK_SIZE];
        bytes[ID_OFFSET..].copy_from_slice(&(MAX_COMPANY_ID + 1).to_be_bytes());
        assert_eq!(
            id_from_block(&bytes),
            Err(Error::OutOfRange {
                value: MAX_COMPANY_ID + 1
            })
        );

        // Forge a token for it by encrypting the raw block directly.
        let codec = test_codec();
        let mut block = Block::from(bytes);
        codec.cipher.encrypt_block(&mut block);
        let forged = Uuid::from_bytes(block.into()).to_string();
        assert_eq!(
            codec.try_decode(&forged),
            Err(Error::OutOfRange {
                value: MAX_COMPANY_ID + 1
            })
        );
        assert_eq!(codec.decode(&forged), None);
    }

    #[test]
    fn test_key_sensitivity() {
        let codec_a = test_codec();
        let codec_b = Codec::new(&Config::new(b"Another key"));

        let accepted = (0..1_000u64)
            .filter(|&id| {
                let token = codec_a.encode(id).unwrap();
                assert_ne!(token, codec_b.encode(id).unwrap());
                codec_b.decode(&token).is_some()
            })
            .count();
        assert_eq!(accepted, 0);
    }

    #[test]
    fn test_resolve() {
        let codec = test_codec();
        let expected = CompanyId::new(42);
        assert_eq!(codec.resolve("3e9c42f2-e0e8-73c2-6d0a-9b63762cfa4b"), expected);
        assert_eq!(codec.resolve("42"), expected);
        assert_eq!(codec.resolve("9007199254740991"), Some(CompanyId::MAX));

        assert_eq!(codec.resolve("00000000-0000-0000-0000-000000000000"), None);
        assert_eq!(codec.resolve("9007199254740992"), None);
        assert_eq!(codec.resolve("-1"), None);
        assert_eq!(codec.resolve(""), None);
    }

    #[test]
    fn test_random_roundtrips() {
        let codec = test_codec();
        let mut rng = rand::thread_rng();
        let range = Uniform::new_inclusive(0u64, MAX_COMPANY_ID);

        for _ in 0..10_000 {
            let number = rng.sample(range);
            let encoded = codec.encode(number).unwrap();
            let decoded = codec.decode(&encoded).expect("Decoding failed");

            assert_eq!(decoded, number, "Failed at number: {}", number);
        }
    }

    #[test]
    fn test_codec_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Codec>();

        let codec = test_codec();
        std::thread::scope(|s| {
            for t in 0..4u64 {
                let codec = &codec;
                s.spawn(move || {
                    for id in (t * 100)..(t * 100 + 100) {
                        let token = codec.encode(id).unwrap();
                        assert_eq!(codec.decode(&token), Some(id));
                    }
                });
            }
        });
    }
}
