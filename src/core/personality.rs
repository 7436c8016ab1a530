use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string is not one of the 16 personality codes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown personality type: {0:?}")]
pub struct UnknownPersonalityType(pub String);

/// One of the 16 four-letter art personality codes
///
/// Letters encode the axes L/S (lone/social), A/R (abstract/representational),
/// E/M (emotional/meaning) and F/C (flow/constructive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PersonalityType {
    Laef,
    Laec,
    Lamf,
    Lamc,
    Lref,
    Lrec,
    Lrmf,
    Lrmc,
    Saef,
    Saec,
    Samf,
    Samc,
    Sref,
    Srec,
    Srmf,
    Srmc,
}

impl PersonalityType {
    /// All types, in matrix row order
    pub const ALL: [PersonalityType; 16] = [
        PersonalityType::Laef,
        PersonalityType::Laec,
        PersonalityType::Lamf,
        PersonalityType::Lamc,
        PersonalityType::Lref,
        PersonalityType::Lrec,
        PersonalityType::Lrmf,
        PersonalityType::Lrmc,
        PersonalityType::Saef,
        PersonalityType::Saec,
        PersonalityType::Samf,
        PersonalityType::Samc,
        PersonalityType::Sref,
        PersonalityType::Srec,
        PersonalityType::Srmf,
        PersonalityType::Srmc,
    ];

    /// Row/column index into a compatibility table
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn code(self) -> &'static str {
        match self {
            PersonalityType::Laef => "LAEF",
            PersonalityType::Laec => "LAEC",
            PersonalityType::Lamf => "LAMF",
            PersonalityType::Lamc => "LAMC",
            PersonalityType::Lref => "LREF",
            PersonalityType::Lrec => "LREC",
            PersonalityType::Lrmf => "LRMF",
            PersonalityType::Lrmc => "LRMC",
            PersonalityType::Saef => "SAEF",
            PersonalityType::Saec => "SAEC",
            PersonalityType::Samf => "SAMF",
            PersonalityType::Samc => "SAMC",
            PersonalityType::Sref => "SREF",
            PersonalityType::Srec => "SREC",
            PersonalityType::Srmf => "SRMF",
            PersonalityType::Srmc => "SRMC",
        }
    }
}

impl fmt::Display for PersonalityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PersonalityType {
    type Err = UnknownPersonalityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        PersonalityType::ALL
            .iter()
            .copied()
            .find(|t| t.code() == upper)
            .ok_or_else(|| UnknownPersonalityType(s.to_string()))
    }
}

impl Serialize for PersonalityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for PersonalityType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
