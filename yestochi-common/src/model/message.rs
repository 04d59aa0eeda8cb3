use crate::model::{Id, post::Comment, user::UserMarker};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

/// Direct messages are stored and returned in the same shape as comments.
pub type Message = Comment;

/// Identifies the conversation between two users, whichever of them asks.
///
/// The lower id always comes first, so `ThreadKey::new(a, b)` and
/// `ThreadKey::new(b, a)` are equal and render as the same `"{low}-{high}"`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ThreadKey {
    low: Id<UserMarker>,
    high: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Error)]
#[error("Invalid message thread key: {0:?}")]
pub struct InvalidThreadKeyError(String);

impl ThreadKey {
    #[must_use]
    pub fn new(first: Id<UserMarker>, second: Id<UserMarker>) -> Self {
        Self {
            low: first.min(second),
            high: first.max(second),
        }
    }
}

impl Display for ThreadKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

impl FromStr for ThreadKey {
    type Err = InvalidThreadKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidThreadKeyError(s.to_owned());

        let (first, second) = s.split_once('-').ok_or_else(invalid)?;
        let first = first.parse().map_err(|_| invalid())?;
        let second = second.parse().map_err(|_| invalid())?;

        Ok(Self::new(first, second))
    }
}

impl Serialize for ThreadKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ThreadKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        inner.parse().map_err(D::Error::custom)
    }
}
