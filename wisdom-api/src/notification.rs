use uuid::Uuid;

use crate::{ArticleId, CommentId, Time, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct NotificationId(pub Uuid);

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    ArticleLike,
    Comment,
    Reply,
    CommentLike,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub article_id: ArticleId,

    /// Comment that was created or liked, if any
    pub comment_id: Option<CommentId>,

    pub sender_name: String,
    pub date: Time,
    pub read: bool,
}

impl Notification {
    /// Returns None if the actor would be notifying themselves
    pub fn new(
        actor: UserId,
        recipient_id: UserId,
        kind: NotificationKind,
        article_id: ArticleId,
        comment_id: Option<CommentId>,
        sender_name: String,
        date: Time,
    ) -> Option<Notification> {
        if actor == recipient_id {
            return None;
        }
        Some(Notification {
            id: NotificationId(Uuid::new_v4()),
            recipient_id,
            kind,
            article_id,
            comment_id,
            sender_name,
            date,
            read: false,
        })
    }
}
