use std::{collections::HashMap, fmt};

use crate::{
    api::{Author, CommentId, UserId},
    Forest, LikeState,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RenderConfig {
    /// Columns of indentation per level of nesting
    pub indent_width: usize,

    /// Replies nested deeper than this are indented as if they were at this depth
    pub max_indent_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> RenderConfig {
        RenderConfig {
            indent_width: 2,
            max_indent_depth: 8,
        }
    }
}

impl RenderConfig {
    pub fn indent_for(&self, depth: usize) -> usize {
        depth.min(self.max_indent_depth) * self.indent_width
    }
}

/// One displayed comment
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentRow {
    pub id: CommentId,
    pub depth: usize,
    pub indent: usize,
    pub author: Author,
    pub text: String,
    pub like_count: usize,
    pub liked_by_me: bool,
    pub like_pending: bool,
    pub is_mine: bool,
}

/// Flattens the forest into display rows, parents before their replies
///
/// Like counts come from `likes` when a state exists for the comment, so
/// that optimistic toggles are visible.
pub fn render(
    forest: &Forest,
    likes: &HashMap<CommentId, LikeState>,
    current_user: UserId,
    config: &RenderConfig,
) -> Vec<CommentRow> {
    forest
        .walk()
        .map(|(depth, node)| {
            let c = &node.comment;
            let (like_count, liked_by_me, like_pending) = match likes.get(&c.id) {
                Some(s) => (s.count(), s.is_liked_by(&current_user), s.is_pending()),
                None => (c.liked_by.len(), c.is_liked_by(&current_user), false),
            };
            CommentRow {
                id: c.id,
                depth,
                indent: config.indent_for(depth),
                author: c.author.clone(),
                text: c.text.clone(),
                like_count,
                liked_by_me,
                like_pending,
                is_mine: c.author.id == current_user,
            }
        })
        .collect()
}

impl fmt::Display for CommentRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:indent$}@{}", "", self.author.handle, indent = self.indent)?;
        if self.author.verified {
            write!(f, " ✓")?;
        }
        write!(f, " [#{}]: {} ({} ", self.id.0, self.text, self.like_count)?;
        match self.liked_by_me {
            true => write!(f, "♥")?,
            false => write!(f, "♡")?,
        }
        if self.like_pending {
            write!(f, "…")?;
        }
        write!(f, ")")
    }
}
