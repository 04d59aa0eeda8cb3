use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;
use yestochi_common::model::{
    Id,
    auth::PasswordHash,
    post::{Comment, CommentMarker, Post, PostMarker},
    user::{User, UserMarker},
};

/// A user as stored: the public profile plus the password hash.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserRecord {
    #[serde(flatten)]
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<PasswordHash>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostRecord {
    pub id: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub likes: u64,
    pub is_liked: bool,
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
}

/// Shared by post comments and direct messages.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommentRecord {
    pub id: Id<CommentMarker>,
    pub author_id: Id<UserMarker>,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Lookup table used to join author ids back into full users on read.
pub(crate) struct UserIndex<'a>(HashMap<Id<UserMarker>, &'a User>);

impl<'a> UserIndex<'a> {
    pub fn new(records: &'a [UserRecord]) -> Self {
        Self(
            records
                .iter()
                .map(|record| (record.user.id, &record.user))
                .collect(),
        )
    }

    pub fn get(&self, id: Id<UserMarker>) -> Option<&'a User> {
        self.0.get(&id).copied()
    }

    pub fn contains(&self, id: Id<UserMarker>) -> bool {
        self.0.contains_key(&id)
    }
}

impl PostRecord {
    pub fn toggle_like(&mut self) {
        if self.is_liked {
            self.likes = self.likes.saturating_sub(1);
        } else {
            self.likes += 1;
        }
        self.is_liked = !self.is_liked;
    }

    /// `None` if the author is unknown. Comments by unknown users are dropped.
    pub fn join(&self, users: &UserIndex<'_>) -> Option<Post> {
        Some(Post {
            id: self.id,
            user: users.get(self.author_id)?.clone(),
            text: self.text.clone(),
            image: self.image.clone(),
            timestamp: self.timestamp,
            likes: self.likes,
            is_liked: self.is_liked,
            comments: self
                .comments
                .iter()
                .filter_map(|comment| comment.join(users))
                .collect(),
        })
    }
}

impl CommentRecord {
    pub fn join(&self, users: &UserIndex<'_>) -> Option<Comment> {
        Some(Comment {
            id: self.id,
            user: users.get(self.author_id)?.clone(),
            text: self.text.clone(),
            timestamp: self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{CommentRecord, PostRecord, UserIndex, UserRecord};
    use time::macros::datetime;
    use yestochi_common::model::user::{User, UserName};

    fn user_record(id: u64, name: &str) -> UserRecord {
        UserRecord {
            user: User {
                id: id.into(),
                name: UserName::new(name.to_owned()).unwrap(),
                ..User::default()
            },
            password_hash: None,
        }
    }

    fn post_record() -> PostRecord {
        PostRecord {
            id: 1_u64.into(),
            author_id: 1_u64.into(),
            text: "hi".to_owned(),
            image: None,
            timestamp: datetime!(2025-06-01 12:00 UTC),
            likes: 0,
            is_liked: false,
            comments: vec![
                CommentRecord {
                    id: 1_u64.into(),
                    author_id: 2_u64.into(),
                    text: "first".to_owned(),
                    timestamp: datetime!(2025-06-01 12:05 UTC),
                },
                CommentRecord {
                    id: 2_u64.into(),
                    author_id: 99_u64.into(),
                    text: "orphan".to_owned(),
                    timestamp: datetime!(2025-06-01 12:06 UTC),
                },
            ],
        }
    }

    #[test]
    fn toggle_like_is_its_own_inverse() {
        let mut post = post_record();
        post.likes = 5;

        post.toggle_like();
        assert_eq!((post.likes, post.is_liked), (6, true));
        post.toggle_like();
        assert_eq!((post.likes, post.is_liked), (5, false));
    }

    #[test]
    fn toggle_like_never_underflows() {
        let mut post = post_record();
        post.is_liked = true;

        post.toggle_like();
        assert_eq!((post.likes, post.is_liked), (0, false));
    }

    #[test]
    fn join_resolves_authors() {
        let users = [user_record(1, "Mark"), user_record(2, "Eduardo")];
        let index = UserIndex::new(&users);

        let post = post_record().join(&index).unwrap();
        assert_eq!(post.user.name.get(), "Mark");
        assert_eq!(post.comments.len(), 1);
        assert_eq!(post.comments[0].user.name.get(), "Eduardo");

        let orphaned = UserIndex::new(&users[1..]);
        assert_eq!(post_record().join(&orphaned), None);
    }

    #[test]
    fn user_record_keeps_profile_fields_flat() {
        let json = serde_json::to_value(user_record(3, "Dustin")).unwrap();
        assert_eq!(json["id"], "3");
        assert_eq!(json["name"], "Dustin");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("user").is_none());
    }
}
