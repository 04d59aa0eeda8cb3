pub mod auth;
pub mod message;
pub mod nickname;
pub mod post;
pub mod user;

use crate::{
    model::{
        post::{EmptyCommentError, EmptyPostError},
        user::InvalidUserNameError,
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Unexpected, Visitor},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserName(#[from] InvalidUserNameError),
    #[error(transparent)]
    EmptyPost(#[from] EmptyPostError),
    #[error(transparent)]
    EmptyComment(#[from] EmptyCommentError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct YestochiEpoch;
impl Epoch for YestochiEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type YestochiSnowflake = Snowflake<YestochiEpoch>;
pub type YestochiSnowflakeGenerator = SnowflakeGenerator<YestochiEpoch>;

/// Serialized as a decimal string: snowflakes exceed the 2^53 integers a
/// JavaScript number holds exactly. Bare integers are accepted on input.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Id<Marker>(YestochiSnowflake, PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: YestochiSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> YestochiSnowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> Serialize for Id<Marker> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, Marker> Deserialize<'de> for Id<Marker> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor(PhantomData))
    }
}

struct IdVisitor<Marker>(PhantomData<Marker>);

impl<Marker> Visitor<'_> for IdVisitor<Marker> {
    type Value = Id<Marker>;

    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("an id as a decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Id::from(v))
    }
}

impl<Marker> FromStr for Id<Marker> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str(s).map(Self::from)
    }
}

impl<Marker> From<YestochiSnowflake> for Id<Marker> {
    fn from(value: YestochiSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for YestochiSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(YestochiSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Id, user::UserMarker};
    use std::collections::BTreeMap;

    #[test]
    fn large_ids_travel_as_strings() {
        let ids: Vec<Id<UserMarker>> = [237_830_885_871_718_400_u64, 237_830_885_871_718_401]
            .map(Id::from)
            .to_vec();

        let json = serde_json::to_value(&ids).unwrap();
        assert_eq!(json, serde_json::json!(["237830885871718400", "237830885871718401"]));

        let back: Vec<Id<UserMarker>> = serde_json::from_value(json).unwrap();
        assert_eq!(back, ids);
    }

    #[test]
    fn integer_ids_are_accepted() {
        let id: Id<UserMarker> = serde_json::from_str("7").unwrap();
        assert_eq!(id, Id::from(7_u64));

        assert!(serde_json::from_str::<Id<UserMarker>>("\"seven\"").is_err());
    }

    #[test]
    fn ids_as_map_keys() {
        let map = BTreeMap::from([(Id::<UserMarker>::from(2_u64), "Wardo")]);

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"2":"Wardo"}"#);
        assert_eq!(serde_json::from_str::<BTreeMap<Id<UserMarker>, &str>>(&json).unwrap(), map);
    }
}
