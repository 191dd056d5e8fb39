use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

use crate::{ArticleId, CommentId};

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Article not found {0:?}")]
    ArticleNotFound(ArticleId),

    #[error("Comment not found {0:?}")]
    CommentNotFound(CommentId),

    #[error("Parent comment not found on this article {0:?}")]
    ParentNotFound(CommentId),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Empty string is not allowed")]
    EmptyString,

    #[error("String is too long ({0} bytes)")]
    StringTooLong(usize),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::ArticleNotFound(_) => StatusCode::NOT_FOUND,
            Error::CommentNotFound(_) => StatusCode::NOT_FOUND,
            Error::ParentNotFound(_) => StatusCode::NOT_FOUND,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::EmptyString => StatusCode::BAD_REQUEST,
            Error::StringTooLong(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::ArticleNotFound(a) => json!({
                "message": "article not found",
                "type": "article-not-found",
                "uuid": a.0,
            }),
            Error::CommentNotFound(c) => json!({
                "message": "comment not found",
                "type": "comment-not-found",
                "uuid": c.0,
            }),
            Error::ParentNotFound(c) => json!({
                "message": "parent comment not found on this article",
                "type": "parent-not-found",
                "uuid": c.0,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::EmptyString => json!({
                "message": "argument string was empty",
                "type": "empty-string",
            }),
            Error::StringTooLong(len) => json!({
                "message": "argument string was too long",
                "type": "string-too-long",
                "len": len,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let uuid = || {
            data.get("uuid")
                .and_then(|uuid| uuid.as_str())
                .and_then(|uuid| Uuid::from_str(uuid).ok())
                .ok_or_else(|| anyhow!("error is a not-found without a proper uuid"))
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(String::from(
                    data.get("message")
                        .and_then(|msg| msg.as_str())
                        .unwrap_or(""),
                )),
                "permission-denied" => Error::PermissionDenied,
                "article-not-found" => Error::ArticleNotFound(ArticleId(uuid()?)),
                "comment-not-found" => Error::CommentNotFound(CommentId(uuid()?)),
                "parent-not-found" => Error::ParentNotFound(CommentId(uuid()?)),
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                "empty-string" => Error::EmptyString,
                "string-too-long" => Error::StringTooLong(
                    data.get("len")
                        .and_then(|l| l.as_u64())
                        .and_then(|l| usize::try_from(l).ok())
                        .ok_or_else(|| anyhow!("error is a string-too-long without a length"))?,
                ),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_round_trip_through_json() {
        let errors = [
            Error::Unknown(String::from("oops")),
            Error::PermissionDenied,
            Error::ArticleNotFound(ArticleId(Uuid::new_v4())),
            Error::CommentNotFound(CommentId(Uuid::new_v4())),
            Error::ParentNotFound(CommentId(Uuid::new_v4())),
            Error::NullByteInString(String::from("a\0b")),
            Error::EmptyString,
            Error::StringTooLong(123456),
        ];
        for err in errors {
            assert_eq!(Error::parse(&err.contents()).unwrap(), err);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Error::parse(b"not json").is_err());
        assert!(Error::parse(br#"{"type":"nope"}"#).is_err());
        assert!(Error::parse(br#"{"type":"comment-not-found"}"#).is_err());
    }
}
