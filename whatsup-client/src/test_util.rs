#![cfg(test)]

use std::collections::HashSet;

use chrono::{TimeZone, Utc};

use crate::api::{Author, Comment, CommentId, UserId};

pub fn comment(id: i64, parent: Option<i64>) -> Comment {
    Comment {
        id: CommentId(id),
        parent_id: parent.map(CommentId),
        author: Author::stub(UserId(100 + id), &format!("user{id}")),
        text: format!("comment {id}"),
        created_at: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
        liked_by: HashSet::new(),
    }
}

pub fn liked(mut c: Comment, by: &[i64]) -> Comment {
    c.liked_by = by.iter().copied().map(UserId).collect();
    c
}
