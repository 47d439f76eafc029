use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::Error;

/// Length of the canonical hyphenated text form.
pub const TOKEN_LENGTH: usize = 36;

const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// An opaque company ID token: 16 ciphertext bytes shown as a canonical UUID.
///
/// Parsing accepts only the 36 character hyphenated form, in either case.
/// Display is always lowercase. Holding a `CompanyIdToken` says nothing about
/// whether it decodes under a particular key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompanyIdToken(Uuid);

impl CompanyIdToken {
    pub(crate) fn from_bytes(bytes: [u8; 16]) -> Self {
        CompanyIdToken(Uuid::from_bytes(bytes))
    }

    /// Parses `s`, requiring canonical hyphenated syntax.
    pub fn parse(s: &str) -> Result<Self, Error> {
        if !is_canonical(s) {
            return Err(Error::MalformedToken);
        }
        Uuid::try_parse(s)
            .map(CompanyIdToken)
            .map_err(|_| Error::MalformedToken)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

// Rejects the simple, braced and URN forms that `Uuid::try_parse` would accept.
fn is_canonical(s: &str) -> bool {
    s.len() == TOKEN_LENGTH
        && s.bytes().enumerate().all(|(i, b)| {
            if HYPHEN_POSITIONS.contains(&i) {
                b == b'-'
            } else {
                b.is_ascii_hexdigit()
            }
        })
}

impl From<Uuid> for CompanyIdToken {
    fn from(uuid: Uuid) -> Self {
        CompanyIdToken(uuid)
    }
}

impl From<CompanyIdToken> for Uuid {
    fn from(token: CompanyIdToken) -> Self {
        token.0
    }
}

impl FromStr for CompanyIdToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        CompanyIdToken::parse(s)
    }
}

impl fmt::Display for CompanyIdToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl Serialize for CompanyIdToken {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CompanyIdToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        CompanyIdToken::parse(&encoded).map_err(serde::de::Error::custom)
    }
}
