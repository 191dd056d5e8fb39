use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

/// Longest accepted article or comment body, in bytes
pub const MAX_CONTENT_LEN: usize = 64 * 1024;

mod article;
pub use article::{Article, ArticleId, ArticleLike, ArticleSort, ArticleWithStats, NewArticle};

mod comment;
pub use comment::{Comment, CommentId, CommentLike, CommentNode, LikeState, NewComment};

mod db;
pub use db::{CommentStore, LikeStore, NotificationSink};

mod error;
pub use error::Error;

mod feed;
pub use feed::{FeedMode, Page, PageRequest};

mod notification;
pub use notification::{Notification, NotificationId, NotificationKind};

mod user;
pub use user::{User, UserId};

// These validation functions are there to make sure both the server and the
// in-memory store reject the same inputs. Anything stored must first go through
// them.

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

/// Like `validate_string`, but also refuses blank or oversized bodies
pub fn validate_content(s: &str) -> Result<(), Error> {
    validate_string(s)?;
    if s.trim().is_empty() {
        return Err(Error::EmptyString);
    }
    if s.len() > MAX_CONTENT_LEN {
        return Err(Error::StringTooLong(s.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_validation() {
        assert_eq!(validate_content("some wisdom"), Ok(()));
        assert_eq!(validate_content("   \n\t"), Err(Error::EmptyString));
        assert_eq!(
            validate_content("foo\0bar"),
            Err(Error::NullByteInString(String::from("foo\0bar")))
        );
        let long = "a".repeat(MAX_CONTENT_LEN + 1);
        assert_eq!(
            validate_content(&long),
            Err(Error::StringTooLong(MAX_CONTENT_LEN + 1))
        );
    }

    #[test]
    fn fuzz_validate_string_accepts_iff_no_null_byte() {
        bolero::check!().with_type::<String>().for_each(|s| {
            assert_eq!(validate_string(s).is_ok(), !s.contains('\0'));
        })
    }
}
