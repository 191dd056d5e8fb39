use async_trait::async_trait;

use crate::{
    ArticleId, Comment, CommentId, CommentLike, Error, LikeState, NewComment, Notification, UserId,
};

// Outer errors are failures of the store itself, inner errors are the
// precondition failures to report to the user.

#[async_trait]
pub trait CommentStore {
    /// All comments of the article, in the order they were recorded
    async fn list_comments(&mut self, article: ArticleId) -> anyhow::Result<Vec<Comment>>;

    /// Fails with ArticleNotFound or ParentNotFound without writing anything
    async fn insert_comment(
        &mut self,
        actor: UserId,
        comment: NewComment,
    ) -> anyhow::Result<Result<CommentId, Error>>;

    /// Only the author of a comment may delete it
    async fn delete_comment(
        &mut self,
        actor: UserId,
        comment: CommentId,
    ) -> anyhow::Result<Result<(), Error>>;
}

#[async_trait]
pub trait LikeStore {
    async fn list_comment_likes(&mut self, article: ArticleId) -> anyhow::Result<Vec<CommentLike>>;

    async fn toggle_comment_like(
        &mut self,
        actor: UserId,
        comment: CommentId,
    ) -> anyhow::Result<Result<LikeState, Error>>;
}

/// Fire-and-forget delivery of notifications, no retries
pub trait NotificationSink {
    fn notify(&self, n: Notification);
}
