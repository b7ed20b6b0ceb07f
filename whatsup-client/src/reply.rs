use crate::api::{Comment, CommentId, UserId};

/// The comment currently being answered
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplyTarget {
    pub comment_id: CommentId,
    pub author_handle: String,
    pub author_id: UserId,
}

impl ReplyTarget {
    pub fn for_comment(c: &Comment) -> ReplyTarget {
        ReplyTarget {
            comment_id: c.id,
            author_handle: c.author.handle.clone(),
            author_id: c.author.id,
        }
    }

    /// Prefix shown in front of the text being typed
    pub fn mention(&self) -> String {
        format!("@{} ", self.author_handle)
    }
}

/// Text input of the comments overlay
///
/// The buffer never contains the mention: it is only added when displaying,
/// and stripped back from the edited text.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Composer {
    buffer: String,
    target: Option<ReplyTarget>,
}

impl Composer {
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn target(&self) -> Option<&ReplyTarget> {
        self.target.as_ref()
    }

    pub fn is_blank(&self) -> bool {
        self.buffer.trim().is_empty()
    }

    pub fn set_target(&mut self, target: ReplyTarget) {
        self.target = Some(target);
    }

    /// Stops replying, keeping what was typed so far
    pub fn cancel_reply(&mut self) {
        self.target = None;
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.target = None;
    }

    pub fn displayed(&self) -> String {
        match &self.target {
            Some(t) => t.mention() + &self.buffer,
            None => self.buffer.clone(),
        }
    }

    /// Takes the full text of the input after the user edited it
    ///
    /// Erasing into the mention cancels the reply: the remaining text is kept
    /// as a plain comment.
    pub fn edit(&mut self, displayed: &str) {
        let stripped = self
            .target
            .as_ref()
            .and_then(|t| displayed.strip_prefix(&t.mention()));
        match stripped {
            Some(text) => self.buffer = String::from(text),
            None => {
                if let Some(t) = self.target.take() {
                    tracing::debug!(target=?t.comment_id, "mention erased, cancelling reply");
                }
                self.buffer = String::from(displayed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> ReplyTarget {
        ReplyTarget {
            comment_id: CommentId(7),
            author_handle: String::from("alice"),
            author_id: UserId(3),
        }
    }

    #[test]
    fn mention_is_prefixed_to_typed_text() {
        let mut c = Composer::default();
        c.set_target(alice());
        assert_eq!(c.displayed(), "@alice ");
        c.edit("@alice hi");
        assert_eq!(c.buffer(), "hi");
        assert_eq!(c.displayed(), "@alice hi");
    }

    #[test]
    fn cancelling_keeps_raw_buffer() {
        let mut c = Composer::default();
        c.set_target(alice());
        c.edit("@alice hi");
        c.cancel_reply();
        assert_eq!(c.target(), None);
        assert_eq!(c.displayed(), "hi");
    }

    #[test]
    fn erasing_into_mention_cancels_reply() {
        let mut c = Composer::default();
        c.set_target(alice());
        c.edit("@alic");
        assert_eq!(c.target(), None);
        assert_eq!(c.buffer(), "@alic");
    }

    #[test]
    fn multibyte_handles_are_stripped_on_char_boundaries() {
        let mut c = Composer::default();
        c.set_target(ReplyTarget {
            author_handle: String::from("zoë"),
            ..alice()
        });
        c.edit("@zoë salut ça va");
        assert_eq!(c.buffer(), "salut ça va");
    }

    #[test]
    fn blank_detection_ignores_mention() {
        let mut c = Composer::default();
        c.set_target(alice());
        c.edit("@alice    ");
        assert!(c.is_blank());
        c.clear();
        assert_eq!(c, Composer::default());
    }

    #[test]
    fn plain_edit_without_target() {
        let mut c = Composer::default();
        c.edit("hello");
        assert_eq!(c.displayed(), "hello");
        assert!(!c.is_blank());
    }
}
