use std::collections::HashSet;

use crate::{Author, Error, Time, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub i64);

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct PostId(pub i64);

/// A comment as returned by the server, flat: replies only point to their parent
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,

    /// Comment this one replies to, None for a top-level comment
    #[serde(default)]
    pub parent_id: Option<CommentId>,

    pub author: Author,
    pub text: String,
    pub created_at: Time,

    /// Set of users who liked this comment
    #[serde(default)]
    pub liked_by: HashSet<UserId>,
}

impl Comment {
    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.liked_by.contains(user)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub post_owner_id: UserId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub text: String,
    pub parent_id: Option<CommentId>,

    /// User mentioned by the reply, if any
    pub reply_to_user: Option<UserId>,
}

impl NewComment {
    // See comments on other `validate` functions throughout whatsup-api
    pub fn validate(&self) -> Result<(), Error> {
        if self.text.trim().is_empty() {
            return Err(Error::EmptyComment);
        }
        crate::validate_string(&self.text)
    }
}
