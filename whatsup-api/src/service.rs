use async_trait::async_trait;

use crate::{Comment, CommentId, NewComment, PostId, UserId};

/// Server-side operations on the comments of a post
///
/// Like and unlike are idempotent: liking twice is the same as liking once.
#[async_trait]
pub trait CommentService {
    /// Flat list of the comments of a post, ordered by creation time
    async fn fetch(
        &mut self,
        post_owner: UserId,
        post: PostId,
        offset: usize,
    ) -> anyhow::Result<Vec<Comment>>;
    async fn create(&mut self, c: NewComment) -> anyhow::Result<Comment>;
    async fn exists(&mut self, c: CommentId) -> anyhow::Result<bool>;
    async fn like(&mut self, c: CommentId, user: UserId) -> anyhow::Result<()>;
    async fn unlike(&mut self, c: CommentId, user: UserId) -> anyhow::Result<()>;
    async fn delete(&mut self, c: CommentId) -> anyhow::Result<()>;
}

/// Sink for short-lived messages shown to the user
pub trait Notifier {
    fn notify(&self, message: &str);
}
