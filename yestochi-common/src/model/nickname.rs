use crate::model::{Id, user::UserMarker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aliases shown instead of a user's real name. Sparse: most users have none.
pub type Nicknames = BTreeMap<Id<UserMarker>, Nickname>;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nickname(String);

impl Nickname {
    /// Trims the alias; an empty one means "no nickname" and yields `None`.
    #[must_use]
    pub fn new(alias: &str) -> Option<Self> {
        let alias = alias.trim();
        (!alias.is_empty()).then(|| Self(alias.to_owned()))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        nickname::{Nickname, Nicknames},
    };

    #[test]
    fn empty_alias_is_no_nickname() {
        assert_eq!(Nickname::new(""), None);
        assert_eq!(Nickname::new("   "), None);
        assert_eq!(Nickname::new(" Wardo ").unwrap().get(), "Wardo");
    }

    #[test]
    fn nicknames_are_keyed_by_user_id_string() {
        let nicknames: Nicknames = serde_json::from_str(r#"{"2": "Wardo", "3": "Mosk"}"#).unwrap();
        assert_eq!(nicknames[&Id::from(2_u64)].get(), "Wardo");
        assert_eq!(nicknames[&Id::from(3_u64)].get(), "Mosk");
        assert_eq!(
            serde_json::to_string(&nicknames).unwrap(),
            r#"{"2":"Wardo","3":"Mosk"}"#
        );
    }
}
