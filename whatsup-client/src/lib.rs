mod comment;
pub use comment::{build_forest, CommentNode, Forest, Walk};

mod error;
pub use error::{Error, Operation};

mod like;
pub use like::{LikeIntent, LikeState};

pub mod overlay;
pub use overlay::{CommentsOverlay, OverlayConfig, PendingToggle, Submitted, Toggle};

mod render;
pub use render::{render, CommentRow, RenderConfig};

mod reply;
pub use reply::{Composer, ReplyTarget};

mod fuzz;
mod test_util;

pub mod api {
    pub use whatsup_api::*;
}
