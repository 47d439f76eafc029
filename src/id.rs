use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// Largest company ID the codec accepts: 2^53 - 1, the largest integer a
/// JavaScript client holds exactly.
pub const MAX_COMPANY_ID: u64 = (1 << 53) - 1;

/// A company ID known to be within `0..=MAX_COMPANY_ID`.
///
/// Serializes as a plain integer; deserialization enforces the bound.
#[cfg_attr(feature = "diesel", derive(diesel::expression::AsExpression))]
#[cfg_attr(feature = "diesel", diesel(sql_type = diesel::sql_types::BigInt))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompanyId(u64);

impl CompanyId {
    pub const MAX: CompanyId = CompanyId(MAX_COMPANY_ID);

    /// Returns the ID if `id` is within the bound.
    pub const fn new(id: u64) -> Option<Self> {
        if id <= MAX_COMPANY_ID {
            Some(CompanyId(id))
        } else {
            None
        }
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<CompanyId> for u64 {
    fn from(id: CompanyId) -> Self {
        id.0
    }
}

impl TryFrom<u64> for CompanyId {
    type Error = Error;

    fn try_from(id: u64) -> Result<Self, Error> {
        CompanyId::new(id).ok_or_else(|| Error::InvalidInput {
            reason: format!("{} exceeds the maximum company ID {}", id, MAX_COMPANY_ID),
        })
    }
}

impl TryFrom<i64> for CompanyId {
    type Error = Error;

    fn try_from(id: i64) -> Result<Self, Error> {
        let id = u64::try_from(id).map_err(|_| Error::InvalidInput {
            reason: format!("{} is negative", id),
        })?;
        CompanyId::try_from(id)
    }
}

impl TryFrom<f64> for CompanyId {
    type Error = Error;

    fn try_from(id: f64) -> Result<Self, Error> {
        let reason = if !id.is_finite() {
            "is not finite"
        } else if id.fract() != 0.0 {
            "is not an integer"
        } else if id < 0.0 {
            "is negative"
        } else if id > MAX_COMPANY_ID as f64 {
            "exceeds the maximum company ID"
        } else {
            // Integral and within 0..=2^53-1, so the cast is exact.
            return Ok(CompanyId(id as u64));
        };
        Err(Error::InvalidInput {
            reason: format!("{} {}", id, reason),
        })
    }
}

impl FromStr for CompanyId {
    type Err = Error;

    /// Parses plain decimal digits. Signs, whitespace and other notations are rejected.
    fn from_str(s: &str) -> Result<Self, Error> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidInput {
                reason: format!("{:?} is not a decimal company ID", s),
            });
        }
        let id = s.parse::<u64>().map_err(|_| Error::InvalidInput {
            reason: format!("{:?} exceeds the maximum company ID {}", s, MAX_COMPANY_ID),
        })?;
        CompanyId::try_from(id)
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for CompanyId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for CompanyId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = u64::deserialize(deserializer)?;
        CompanyId::try_from(id).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "diesel")]
mod sql {
    use diesel::deserialize::{self, FromSql, Queryable};
    use diesel::pg::{Pg, PgValue};
    use diesel::serialize::{self, Output, ToSql};
    use diesel::sql_types::BigInt;

    use super::CompanyId;

    impl ToSql<BigInt, Pg> for CompanyId {
        fn to_sql(&self, out: &mut Output<'_, '_, Pg>) -> serialize::Result {
            // Within 2^53, so the value always fits an i64.
            <i64 as ToSql<BigInt, Pg>>::to_sql(&(self.0 as i64), &mut out.reborrow())
        }
    }

    impl FromSql<BigInt, Pg> for CompanyId {
        fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
            let id = <i64 as FromSql<BigInt, Pg>>::from_sql(bytes)?;
            Ok(CompanyId::try_from(id)?)
        }
    }

    impl Queryable<BigInt, Pg> for CompanyId {
        type Row = <i64 as Queryable<BigInt, Pg>>::Row;

        fn build(row: Self::Row) -> deserialize::Result<Self> {
            let id = i64::build(row)?;
            Ok(CompanyId::try_from(id)?)
        }
    }
}
