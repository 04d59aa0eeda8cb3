use crate::model::{Id, user::User};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub user: User,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub likes: u64,
    pub is_liked: bool,
    pub comments: Vec<Comment>,
}

/// A comment on a post. Direct messages share this shape.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub user: User,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// What a user submits when creating a post: some text, an image, or both.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(try_from = "RawPostContent")]
pub struct PostContent {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

#[derive(Deserialize)]
struct RawPostContent {
    #[serde(default)]
    text: String,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("A post needs text or an image")]
pub struct EmptyPostError;

impl PostContent {
    pub fn new(text: String, image: Option<String>) -> Result<Self, EmptyPostError> {
        let image = image.filter(|image| !image.is_empty());
        if text.trim().is_empty() && image.is_none() {
            return Err(EmptyPostError);
        }

        Ok(Self { text, image })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    #[must_use]
    pub fn into_parts(self) -> (String, Option<String>) {
        (self.text, self.image)
    }
}

impl TryFrom<RawPostContent> for PostContent {
    type Error = EmptyPostError;

    fn try_from(value: RawPostContent) -> Result<Self, Self::Error> {
        Self::new(value.text, value.image)
    }
}

/// Text of a comment or a direct message. Never blank.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct CommentText(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("A comment cannot be blank")]
pub struct EmptyCommentError;

impl CommentText {
    pub fn new(text: String) -> Result<Self, EmptyCommentError> {
        if text.trim().is_empty() {
            return Err(EmptyCommentError);
        }

        Ok(Self(text))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for CommentText {
    type Error = EmptyCommentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::post::{CommentText, EmptyPostError, PostContent};

    #[test]
    fn post_content_needs_text_or_image() {
        assert_eq!(
            PostContent::new("  ".to_owned(), None),
            Err(EmptyPostError)
        );
        assert_eq!(
            PostContent::new(String::new(), Some(String::new())),
            Err(EmptyPostError)
        );

        let image_only = PostContent::new(String::new(), Some("data:image/png;base64,AA".to_owned()))
            .unwrap();
        assert_eq!(image_only.image(), Some("data:image/png;base64,AA"));

        let text_only = PostContent::new("hello".to_owned(), Some(String::new())).unwrap();
        assert_eq!(text_only.text(), "hello");
        assert_eq!(text_only.image(), None);
    }

    #[test]
    fn post_content_deserialization_validates() {
        assert!(serde_json::from_str::<PostContent>(r#"{"text": ""}"#).is_err());
        let content: PostContent = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(content.text(), "hi");
    }

    #[test]
    fn comment_text_rejects_blank() {
        assert!(CommentText::new(" \n".to_owned()).is_err());
        assert!(serde_json::from_str::<CommentText>(r#""""#).is_err());
        assert_eq!(CommentText::new("ok".to_owned()).unwrap().get(), "ok");
    }
}
