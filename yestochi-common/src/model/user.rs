use crate::model::{Id, auth::Password};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const USER_NAME_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id<UserMarker>,
    pub name: UserName,
    pub profile_picture: String,
    pub cover_photo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Everything a registration supplies; the id is assigned by the store.
#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub name: UserName,
    pub password: Password,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub cover_photo: String,
    #[serde(default)]
    pub profile_color: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// A partial profile edit. Absent fields are left alone; an empty string
/// clears one of the optional fields.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<UserName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl User {
    #[must_use]
    pub fn from_registration(id: Id<UserMarker>, user: CreateUser) -> Self {
        Self {
            id,
            name: user.name,
            profile_picture: user.profile_picture,
            cover_photo: user.cover_photo,
            profile_color: non_empty(user.profile_color),
            background_color: non_empty(user.background_color),
            font: non_empty(user.font),
            bio: non_empty(user.bio),
        }
    }

    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(profile_picture) = patch.profile_picture {
            self.profile_picture = profile_picture;
        }
        if let Some(cover_photo) = patch.cover_photo {
            self.cover_photo = cover_photo;
        }
        merge_optional(&mut self.profile_color, patch.profile_color);
        merge_optional(&mut self.background_color, patch.background_color);
        merge_optional(&mut self.font, patch.font);
        merge_optional(&mut self.bio, patch.bio);
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn merge_optional(field: &mut Option<String>, update: Option<String>) {
    if let Some(update) = update {
        *field = non_empty(Some(update));
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The user name is invalid: {0:?}")]
pub struct InvalidUserNameError(String);

impl UserName {
    pub fn new(name: String) -> Result<Self, InvalidUserNameError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.chars().count() > USER_NAME_MAX_LEN {
            return Err(InvalidUserNameError(name));
        }

        Ok(UserName(trimmed.to_owned()))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Case-insensitive comparison used for logins and name uniqueness.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.trim().to_lowercase()
    }
}

impl<'de> Deserialize<'de> for UserName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserName::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"UserName"))
    }
}
