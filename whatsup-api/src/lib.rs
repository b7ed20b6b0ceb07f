use chrono::Utc;

mod comment;
pub use comment::{Comment, CommentId, NewComment, PostId};

mod error;
pub use error::Error;

mod service;
pub use service::{CommentService, Notifier};

mod user;
pub use user::{Author, UserId};

pub type Time = chrono::DateTime<Utc>;

pub const STUB_ID: i64 = -1;

// Validation functions are used by the client before submitting, and by any
// server that wants to reject inputs the rest of the stack cannot store
pub fn validate_string(s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(String::from(s))),
        false => Ok(()),
    }
}
