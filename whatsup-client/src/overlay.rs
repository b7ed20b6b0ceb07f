use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use anyhow::Context;

use crate::{
    api::{Comment, CommentId, CommentService, NewComment, Notifier, PostId, UserId},
    build_forest, render, CommentRow, Composer, Error, Forest, LikeIntent, LikeState, Operation,
    RenderConfig, ReplyTarget,
};

pub const NOTICE_COMMENT_ADDED: &str = "Your comment was added!";
pub const NOTICE_COMMENT_GONE: &str = "This comment no longer exists!";
pub const NOTICE_COMMENT_DELETED: &str = "Your comment was deleted";
pub const NOTICE_POST_FAILED: &str = "Could not add your comment, please try again";
pub const NOTICE_LIKE_FAILED: &str = "Could not update your like, please try again";
pub const NOTICE_DELETE_FAILED: &str = "Could not delete your comment, please try again";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OverlayConfig {
    /// Applies to each call to the comment service
    pub request_timeout: Duration,
    pub render: RenderConfig,
}

impl Default for OverlayConfig {
    fn default() -> OverlayConfig {
        OverlayConfig {
            request_timeout: Duration::from_secs(10),
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum Submitted {
    /// Nothing but whitespace was typed, nothing was sent
    Rejected,
    Posted(CommentId),
}

/// A like toggle whose optimistic state is already shown
///
/// Must be passed to `complete_like_toggle` or `cancel_like_toggle`, otherwise
/// the comment stays busy and refuses further toggles.
#[must_use]
#[derive(Debug, Eq, PartialEq)]
pub struct PendingToggle {
    comment: CommentId,
    intent: LikeIntent,
}

impl PendingToggle {
    pub fn comment(&self) -> CommentId {
        self.comment
    }

    pub fn intent(&self) -> LikeIntent {
        self.intent
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum Toggle {
    Started(PendingToggle),

    /// Another toggle of the same comment is still in flight
    Busy,
}

/// The comment section of one post, as seen by one user
///
/// The server stays the source of truth: after posting or deleting, the
/// whole list is fetched again. Only likes are shown ahead of the server.
pub struct CommentsOverlay<S, N> {
    service: S,
    notifier: N,
    config: OverlayConfig,
    current_user: UserId,
    post_owner: UserId,
    post: PostId,

    comments: Arc<Vec<Comment>>,
    // Derived from `comments`, rebuilt only when a new list is installed
    forest: Arc<Forest>,
    likes: HashMap<CommentId, LikeState>,
    composer: Composer,
}

async fn with_timeout<T>(
    limit: Duration,
    op: Operation,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, Error> {
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => Ok(res.with_context(|| op.to_string())?),
        Err(_) => Err(Error::Timeout(op)),
    }
}

impl<S, N> CommentsOverlay<S, N>
where
    S: CommentService,
    N: Notifier,
{
    pub fn new(
        service: S,
        notifier: N,
        current_user: UserId,
        post_owner: UserId,
        post: PostId,
        config: OverlayConfig,
    ) -> CommentsOverlay<S, N> {
        CommentsOverlay {
            service,
            notifier,
            config,
            current_user,
            post_owner,
            post,
            comments: Arc::new(Vec::new()),
            forest: Arc::new(Forest::default()),
            likes: HashMap::new(),
            composer: Composer::default(),
        }
    }

    pub fn current_user(&self) -> UserId {
        self.current_user
    }

    pub fn comments(&self) -> &Arc<Vec<Comment>> {
        &self.comments
    }

    pub fn forest(&self) -> &Arc<Forest> {
        &self.forest
    }

    pub fn like_state(&self, id: CommentId) -> Option<&LikeState> {
        self.likes.get(&id)
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn rows(&self) -> Vec<CommentRow> {
        render(
            &self.forest,
            &self.likes,
            self.current_user,
            &self.config.render,
        )
    }

    pub fn displayed_text(&self) -> String {
        self.composer.displayed()
    }

    pub fn edit(&mut self, displayed: &str) {
        self.composer.edit(displayed);
    }

    pub fn reply_to(&mut self, id: CommentId) -> Result<(), Error> {
        let c = self
            .comments
            .iter()
            .find(|c| c.id == id)
            .ok_or(Error::UnknownComment(id))?;
        self.composer.set_target(ReplyTarget::for_comment(c));
        Ok(())
    }

    pub fn cancel_reply(&mut self) {
        self.composer.cancel_reply();
    }

    /// Fetches the comments again, keeping the current ones if that fails
    pub async fn load(&mut self) -> Result<(), Error> {
        let res = with_timeout(
            self.config.request_timeout,
            Operation::Fetch,
            self.service.fetch(self.post_owner, self.post, 0),
        )
        .await;
        match res {
            Ok(comments) => {
                tracing::debug!(post=?self.post, num_comments = comments.len(), "loaded comments");
                self.install(comments);
                Ok(())
            }
            Err(err) => {
                tracing::error!(?err, post=?self.post, "failed loading comments");
                Err(err)
            }
        }
    }

    fn install(&mut self, comments: Vec<Comment>) {
        let comments = Arc::new(comments);
        let mut likes = HashMap::with_capacity(comments.len());
        for c in comments.iter() {
            let state = match self.likes.remove(&c.id) {
                Some(mut s) => {
                    s.sync(&c.liked_by);
                    s
                }
                None => LikeState::new(&c.liked_by),
            };
            likes.insert(c.id, state);
        }
        self.forest = Arc::new(build_forest(&comments));
        self.likes = likes;
        self.comments = comments;
    }

    /// Posts the composed text, as a reply if a reply target is set
    pub async fn submit(&mut self) -> Result<Submitted, Error> {
        if self.composer.is_blank() {
            tracing::debug!("not submitting blank comment");
            return Ok(Submitted::Rejected);
        }
        let target = self.composer.target().cloned();
        let new = NewComment {
            post_owner_id: self.post_owner,
            post_id: self.post,
            author_id: self.current_user,
            text: String::from(self.composer.buffer()),
            parent_id: target.as_ref().map(|t| t.comment_id),
            reply_to_user: target.map(|t| t.author_id),
        };
        new.validate()?;

        let created = with_timeout(
            self.config.request_timeout,
            Operation::Create,
            self.service.create(new),
        )
        .await;
        let created = match created {
            Ok(c) => c,
            Err(err) => {
                tracing::error!(?err, post=?self.post, "failed adding comment");
                self.notifier.notify(NOTICE_POST_FAILED);
                return Err(err);
            }
        };
        tracing::debug!(comment=?created.id, "comment added");
        self.composer.clear();
        // A failed reload is logged and leaves the previous list in place
        let _ = self.load().await;
        self.notifier.notify(NOTICE_COMMENT_ADDED);
        Ok(Submitted::Posted(created.id))
    }

    /// Checks the comment still exists, then shows the like toggled
    pub async fn begin_like_toggle(&mut self, id: CommentId) -> Result<Toggle, Error> {
        let user = self.current_user;
        let intent = match self
            .likes
            .get_mut(&id)
            .ok_or(Error::UnknownComment(id))?
            .begin(user)
        {
            Some(intent) => intent,
            None => {
                tracing::debug!(comment=?id, "like toggle already in flight");
                return Ok(Toggle::Busy);
            }
        };

        let exists = with_timeout(
            self.config.request_timeout,
            Operation::Exists,
            self.service.exists(id),
        )
        .await;
        let state = self.likes.get_mut(&id);
        match exists {
            Ok(true) => {
                if let Some(s) = state {
                    s.apply();
                }
                Ok(Toggle::Started(PendingToggle {
                    comment: id,
                    intent,
                }))
            }
            Ok(false) => {
                if let Some(s) = state {
                    s.abort();
                }
                tracing::info!(comment=?id, "tried toggling like on deleted comment");
                self.notifier.notify(NOTICE_COMMENT_GONE);
                Err(Error::CommentGone(id))
            }
            Err(err) => {
                if let Some(s) = state {
                    s.abort();
                }
                tracing::error!(?err, comment=?id, "failed checking comment existence");
                self.notifier.notify(NOTICE_LIKE_FAILED);
                Err(err)
            }
        }
    }

    /// Sends the like or unlike, rolling the shown state back on failure
    pub async fn complete_like_toggle(&mut self, t: PendingToggle) -> Result<LikeIntent, Error> {
        let PendingToggle { comment, intent } = t;
        let timeout = self.config.request_timeout;
        let res = match intent {
            LikeIntent::Like => {
                with_timeout(
                    timeout,
                    Operation::Like,
                    self.service.like(comment, self.current_user),
                )
                .await
            }
            LikeIntent::Unlike => {
                with_timeout(
                    timeout,
                    Operation::Unlike,
                    self.service.unlike(comment, self.current_user),
                )
                .await
            }
        };
        if let Some(s) = self.likes.get_mut(&comment) {
            s.settle(res.is_ok());
        }
        match res {
            Ok(()) => Ok(intent),
            Err(err) => {
                tracing::warn!(?err, ?comment, ?intent, "like toggle failed, rolled back");
                self.notifier.notify(NOTICE_LIKE_FAILED);
                Err(err)
            }
        }
    }

    /// Drops a toggle without sending it, restoring the previous state
    pub fn cancel_like_toggle(&mut self, t: PendingToggle) {
        if let Some(s) = self.likes.get_mut(&t.comment) {
            s.settle(false);
        }
    }

    /// Returns None if a toggle of this comment was already in flight
    pub async fn toggle_like(&mut self, id: CommentId) -> Result<Option<LikeIntent>, Error> {
        match self.begin_like_toggle(id).await? {
            Toggle::Busy => Ok(None),
            Toggle::Started(t) => self.complete_like_toggle(t).await.map(Some),
        }
    }

    /// Deletes one of the current user's comments, then reloads
    pub async fn delete(&mut self, id: CommentId) -> Result<(), Error> {
        let author = self
            .comments
            .iter()
            .find(|c| c.id == id)
            .ok_or(Error::UnknownComment(id))?
            .author
            .id;
        if author != self.current_user {
            return Err(Error::NotAuthor(id));
        }
        let res = with_timeout(
            self.config.request_timeout,
            Operation::Delete,
            self.service.delete(id),
        )
        .await;
        if let Err(err) = res {
            tracing::error!(?err, comment=?id, "failed deleting comment");
            self.notifier.notify(NOTICE_DELETE_FAILED);
            return Err(err);
        }
        if self.composer.target().map(|t| t.comment_id) == Some(id) {
            self.composer.cancel_reply();
        }
        let _ = self.load().await;
        self.notifier.notify(NOTICE_COMMENT_DELETED);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whatsup_mock_server::{Call, Entry, MockServer, Op, RecordingNotifier};

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);
    const OWNER: UserId = UserId(10);
    const POST: PostId = PostId(20);

    type Overlay = CommentsOverlay<MockServer, RecordingNotifier>;

    fn setup(user: UserId) -> (MockServer, RecordingNotifier, Overlay) {
        let server = MockServer::new();
        server.add_author(whatsup_api::Author::stub(ALICE, "alice"));
        server.add_author(whatsup_api::Author::stub(BOB, "bob"));
        let notifier = RecordingNotifier::default();
        let overlay = CommentsOverlay::new(
            server.clone(),
            notifier.clone(),
            user,
            OWNER,
            POST,
            OverlayConfig::default(),
        );
        (server, notifier, overlay)
    }

    fn ids(overlay: &Overlay) -> Vec<(i64, usize)> {
        overlay.rows().iter().map(|r| (r.id.0, r.depth)).collect()
    }

    #[tokio::test]
    async fn load_builds_tree() {
        let (server, _, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, ALICE, "first", None);
        let c2 = server.test_post(OWNER, POST, BOB, "answer", Some(c1));
        let c3 = server.test_post(OWNER, POST, BOB, "second", None);
        server.test_post(OWNER, PostId(99), BOB, "elsewhere", None);

        overlay.load().await.unwrap();
        assert_eq!(ids(&overlay), vec![(c1.0, 0), (c2.0, 1), (c3.0, 0)]);
        assert_eq!(
            server.calls(),
            vec![Call::Fetch {
                post_owner: OWNER,
                post: POST,
                offset: 0
            }]
        );
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_comments() {
        let (server, _, mut overlay) = setup(ALICE);
        server.test_post(OWNER, POST, ALICE, "first", None);
        overlay.load().await.unwrap();
        let before = overlay.comments().clone();

        server.test_post(OWNER, POST, ALICE, "second", None);
        server.fail(Op::Fetch);
        assert!(matches!(overlay.load().await, Err(Error::Service(_))));
        assert!(Arc::ptr_eq(overlay.comments(), &before));
        assert_eq!(overlay.rows().len(), 1);
    }

    #[tokio::test]
    async fn blank_submission_does_nothing() {
        let (server, notifier, mut overlay) = setup(ALICE);
        overlay.edit("   \n\t");
        assert_eq!(overlay.submit().await.unwrap(), Submitted::Rejected);
        assert!(server.journal().is_empty());
        assert!(notifier.messages().is_empty());
        assert_eq!(overlay.displayed_text(), "   \n\t");
    }

    #[tokio::test(start_paused = true)]
    async fn submit_reloads_after_create_resolved() {
        let (server, notifier, mut overlay) = setup(ALICE);
        server.set_latency(Op::Create, Duration::from_secs(1));
        overlay.edit("hello");
        let posted = overlay.submit().await.unwrap();

        let id = match posted {
            Submitted::Posted(id) => id,
            Submitted::Rejected => panic!("comment was rejected"),
        };
        assert_eq!(
            server.journal(),
            vec![
                Entry::Started(Call::Create(NewComment {
                    post_owner_id: OWNER,
                    post_id: POST,
                    author_id: ALICE,
                    text: String::from("hello"),
                    parent_id: None,
                    reply_to_user: None,
                })),
                Entry::Resolved(Op::Create),
                Entry::Started(Call::Fetch {
                    post_owner: OWNER,
                    post: POST,
                    offset: 0
                }),
                Entry::Resolved(Op::Fetch),
            ]
        );
        assert_eq!(ids(&overlay), vec![(id.0, 0)]);
        assert_eq!(overlay.displayed_text(), "");
        assert_eq!(notifier.messages(), vec![NOTICE_COMMENT_ADDED]);
    }

    #[tokio::test]
    async fn reply_is_tagged_with_parent_and_mention() {
        let (server, _, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, BOB, "hey", None);
        overlay.load().await.unwrap();

        overlay.reply_to(c1).unwrap();
        assert_eq!(overlay.displayed_text(), "@bob ");
        overlay.edit("@bob hi");
        assert_eq!(overlay.displayed_text(), "@bob hi");
        server.clear_journal();
        overlay.submit().await.unwrap();

        match &server.calls()[0] {
            Call::Create(c) => {
                assert_eq!(c.text, "hi");
                assert_eq!(c.parent_id, Some(c1));
                assert_eq!(c.reply_to_user, Some(BOB));
            }
            c => panic!("expected a create call, got {c:?}"),
        }
        assert_eq!(overlay.composer().target(), None);
        let rows = overlay.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].depth, 1);
    }

    #[tokio::test]
    async fn reply_to_unknown_comment_is_refused() {
        let (_, _, mut overlay) = setup(ALICE);
        assert!(matches!(
            overlay.reply_to(CommentId(3)),
            Err(Error::UnknownComment(CommentId(3)))
        ));
    }

    #[tokio::test]
    async fn failed_create_keeps_buffer() {
        let (server, notifier, mut overlay) = setup(ALICE);
        server.fail(Op::Create);
        overlay.edit("hello");
        assert!(overlay.submit().await.is_err());
        assert_eq!(overlay.displayed_text(), "hello");
        assert_eq!(notifier.messages(), vec![NOTICE_POST_FAILED]);
        assert!(!server.calls().iter().any(|c| c.op() == Op::Fetch));
    }

    #[tokio::test]
    async fn unlike_is_shown_before_the_call_resolves() {
        let (server, _, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, BOB, "hey", None);
        server.test_set_likes(c1, &[ALICE]);
        overlay.load().await.unwrap();
        assert!(overlay.rows()[0].liked_by_me);

        let pending = match overlay.begin_like_toggle(c1).await.unwrap() {
            Toggle::Started(p) => p,
            Toggle::Busy => panic!("comment should not be busy"),
        };
        assert_eq!(pending.intent(), LikeIntent::Unlike);
        // Nothing sent yet, but already shown
        assert!(!server.calls().iter().any(|c| c.op() == Op::Unlike));
        let row = &overlay.rows()[0];
        assert_eq!((row.liked_by_me, row.like_count, row.like_pending), (false, 0, true));

        assert_eq!(overlay.complete_like_toggle(pending).await.unwrap(), LikeIntent::Unlike);
        assert!(!overlay.rows()[0].liked_by_me);
        assert!(server.comment(c1).unwrap().liked_by.is_empty());
    }

    #[tokio::test]
    async fn second_tap_in_flight_is_ignored() {
        let (server, _, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, BOB, "hey", None);
        overlay.load().await.unwrap();

        let pending = match overlay.begin_like_toggle(c1).await.unwrap() {
            Toggle::Started(p) => p,
            Toggle::Busy => panic!("comment should not be busy"),
        };
        assert_eq!(overlay.begin_like_toggle(c1).await.unwrap(), Toggle::Busy);
        assert_eq!(overlay.like_state(c1).unwrap().count(), 1);
        overlay.complete_like_toggle(pending).await.unwrap();

        let likes = server
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Like(..) | Call::Exists(_)))
            .collect::<Vec<_>>();
        assert_eq!(likes, vec![Call::Exists(c1), Call::Like(c1, ALICE)]);
        assert_eq!(server.comment(c1).unwrap().liked_by.len(), 1);
    }

    #[tokio::test]
    async fn deleted_comment_is_not_toggled() {
        let (server, notifier, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, BOB, "hey", None);
        server.test_set_likes(c1, &[BOB]);
        overlay.load().await.unwrap();
        server.test_remove(c1);

        assert!(matches!(
            overlay.toggle_like(c1).await,
            Err(Error::CommentGone(id)) if id == c1
        ));
        assert_eq!(notifier.messages(), vec![NOTICE_COMMENT_GONE]);
        let state = overlay.like_state(c1).unwrap();
        assert!(!state.is_busy());
        assert_eq!(state.count(), 1);
        assert!(!server
            .calls()
            .iter()
            .any(|c| matches!(c.op(), Op::Like | Op::Unlike)));
    }

    #[tokio::test]
    async fn failed_like_is_rolled_back() {
        let (server, notifier, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, BOB, "hey", None);
        overlay.load().await.unwrap();
        server.fail(Op::Like);

        assert!(overlay.toggle_like(c1).await.is_err());
        let row = &overlay.rows()[0];
        assert_eq!((row.liked_by_me, row.like_count, row.like_pending), (false, 0, false));
        assert_eq!(notifier.messages(), vec![NOTICE_LIKE_FAILED]);

        server.heal(Op::Like);
        assert_eq!(overlay.toggle_like(c1).await.unwrap(), Some(LikeIntent::Like));
        assert!(overlay.rows()[0].liked_by_me);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_like_times_out_and_rolls_back() {
        let (server, notifier, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, BOB, "hey", None);
        overlay.load().await.unwrap();
        server.set_latency(Op::Like, Duration::from_secs(60));

        assert!(matches!(
            overlay.toggle_like(c1).await,
            Err(Error::Timeout(Operation::Like))
        ));
        assert!(!overlay.rows()[0].liked_by_me);
        assert_eq!(notifier.messages(), vec![NOTICE_LIKE_FAILED]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_existence_check_times_out() {
        let (server, _, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, BOB, "hey", None);
        overlay.load().await.unwrap();
        server.set_latency(Op::Exists, Duration::from_secs(60));

        assert!(matches!(
            overlay.toggle_like(c1).await,
            Err(Error::Timeout(Operation::Exists))
        ));
        assert!(!overlay.like_state(c1).unwrap().is_busy());
    }

    #[tokio::test]
    async fn reload_keeps_pending_like_shown() {
        let (server, _, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, BOB, "hey", None);
        overlay.load().await.unwrap();

        let pending = match overlay.begin_like_toggle(c1).await.unwrap() {
            Toggle::Started(p) => p,
            Toggle::Busy => panic!("comment should not be busy"),
        };
        server.test_set_likes(c1, &[BOB]);
        overlay.load().await.unwrap();
        let row = &overlay.rows()[0];
        assert_eq!((row.liked_by_me, row.like_count), (true, 2));

        overlay.cancel_like_toggle(pending);
        let row = &overlay.rows()[0];
        assert_eq!((row.liked_by_me, row.like_count), (false, 1));
    }

    #[tokio::test]
    async fn forest_is_only_rebuilt_on_reload() {
        let (server, _, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, BOB, "hey", None);
        overlay.load().await.unwrap();
        let forest = overlay.forest().clone();

        overlay.toggle_like(c1).await.unwrap();
        overlay.reply_to(c1).unwrap();
        overlay.edit("@bob yo");
        assert!(Arc::ptr_eq(overlay.forest(), &forest));

        overlay.load().await.unwrap();
        assert!(!Arc::ptr_eq(overlay.forest(), &forest));
    }

    #[tokio::test]
    async fn replies_to_deleted_comment_move_to_top_level() {
        let (server, notifier, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, ALICE, "mine", None);
        let c2 = server.test_post(OWNER, POST, BOB, "reply", Some(c1));
        overlay.load().await.unwrap();
        overlay.reply_to(c1).unwrap();

        overlay.delete(c1).await.unwrap();
        assert_eq!(ids(&overlay), vec![(c2.0, 0)]);
        assert_eq!(overlay.composer().target(), None);
        assert_eq!(notifier.messages(), vec![NOTICE_COMMENT_DELETED]);
    }

    #[tokio::test]
    async fn only_author_deletes() {
        let (server, _, mut overlay) = setup(ALICE);
        let c1 = server.test_post(OWNER, POST, BOB, "not mine", None);
        overlay.load().await.unwrap();
        assert!(matches!(overlay.delete(c1).await, Err(Error::NotAuthor(_))));
        assert!(server.comment(c1).is_some());
    }
}
