use anyhow::{anyhow, Context};
use serde_json::json;

use crate::CommentId;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Comment not found {0:?}")]
    NotFound(CommentId),

    #[error("Comment text is empty")]
    EmptyComment,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::EmptyComment => StatusCode::BAD_REQUEST,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
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
            Error::NotFound(id) => json!({
                "message": "comment not found",
                "type": "not-found",
                "commentId": id,
            }),
            Error::EmptyComment => json!({
                "message": "comment text is empty",
                "type": "empty-comment",
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
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
                "not-found" => Error::NotFound(CommentId(
                    data.get("commentId")
                        .and_then(|id| id.as_i64())
                        .ok_or_else(|| anyhow!("error is a not-found without a comment id"))?,
                )),
                "empty-comment" => Error::EmptyComment,
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_from(kind: u8, id: i64, s: String) -> Error {
        match kind % 5 {
            0 => Error::Unknown(s),
            1 => Error::PermissionDenied,
            2 => Error::NotFound(CommentId(id)),
            3 => Error::EmptyComment,
            _ => Error::NullByteInString(s),
        }
    }

    #[test]
    fn errors_round_trip_through_json() {
        bolero::check!()
            .with_type::<(u8, i64, String)>()
            .cloned()
            .for_each(|(kind, id, s)| {
                let err = error_from(kind, id, s);
                assert_eq!(Error::parse(&err.contents()).unwrap(), err);
            });
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            Error::NotFound(CommentId(3)).status_code(),
            http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::EmptyComment.status_code(),
            http::StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(Error::parse(br#"{"type": "nope"}"#).is_err());
        assert!(Error::parse(b"not json").is_err());
    }
}
