use uuid::Uuid;

use crate::{ArticleId, Error, Time, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub author_id: UserId,
    pub author_name: String,
    pub content: String,
    pub date: Time,

    /// None for a top-level comment
    pub parent_id: Option<CommentId>,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// What a user submits to comment on an article or reply to a comment
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub article_id: ArticleId,
    pub content: String,
    pub parent_id: Option<CommentId>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_content(&self.content)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentLike {
    pub comment_id: CommentId,
    pub user_id: UserId,
    pub date: Time,
}

/// State of a (comment, user) like after a toggle
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum LikeState {
    Liked,
    Unliked,
}

/// A comment along with its resolved replies
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentNode {
    pub comment: Comment,

    /// Number of distinct users who liked this comment
    pub like_count: usize,

    /// 0 for top-level comments
    pub depth: usize,

    /// Direct replies, in the order they were recorded
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn id(&self) -> CommentId {
        self.comment.id
    }

    /// Depth-first, in tree order
    pub fn find_in<'a>(nodes: &'a [CommentNode], id: &CommentId) -> Option<&'a CommentNode> {
        let mut todo = nodes.iter().rev().collect::<Vec<_>>();
        while let Some(n) = todo.pop() {
            if n.comment.id == *id {
                return Some(n);
            }
            todo.extend(n.children.iter().rev());
        }
        None
    }
}

impl Drop for CommentNode {
    // iterative, replies nest arbitrarily deep
    fn drop(&mut self) {
        let mut todo = std::mem::take(&mut self.children);
        while let Some(mut n) = todo.pop() {
            todo.append(&mut n.children);
        }
    }
}
