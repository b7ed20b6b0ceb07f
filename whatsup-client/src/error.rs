use std::fmt;

use crate::api::{self, CommentId};

/// Collaborator call, used to report what timed out
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    Fetch,
    Create,
    Exists,
    Like,
    Unlike,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Fetch => "fetching comments",
            Operation::Create => "creating comment",
            Operation::Exists => "checking comment existence",
            Operation::Like => "liking comment",
            Operation::Unlike => "unliking comment",
            Operation::Delete => "deleting comment",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} timed out")]
    Timeout(Operation),

    #[error("Comment {0:?} no longer exists")]
    CommentGone(CommentId),

    #[error("Comment {0:?} is not loaded")]
    UnknownComment(CommentId),

    #[error("Comment {0:?} belongs to someone else")]
    NotAuthor(CommentId),

    #[error(transparent)]
    Invalid(#[from] api::Error),

    #[error(transparent)]
    Service(#[from] anyhow::Error),
}
