use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use whatsup_api::{
    Author, Comment, CommentId, CommentService, Error, NewComment, Notifier, PostId, UserId,
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Op {
    Fetch,
    Create,
    Exists,
    Like,
    Unlike,
    Delete,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    Fetch {
        post_owner: UserId,
        post: PostId,
        offset: usize,
    },
    Create(NewComment),
    Exists(CommentId),
    Like(CommentId, UserId),
    Unlike(CommentId, UserId),
    Delete(CommentId),
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Fetch { .. } => Op::Fetch,
            Call::Create(_) => Op::Create,
            Call::Exists(_) => Op::Exists,
            Call::Like(..) => Op::Like,
            Call::Unlike(..) => Op::Unlike,
            Call::Delete(_) => Op::Delete,
        }
    }
}

/// What happened on the mock server, in order
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Entry {
    Started(Call),
    Resolved(Op),
}

#[derive(Debug, Default)]
struct State {
    last_id: i64,
    authors: HashMap<UserId, Author>,
    posts: BTreeMap<(UserId, PostId), Vec<Comment>>,
    journal: Vec<Entry>,
    failing: HashSet<Op>,
    latency: HashMap<Op, Duration>,
}

impl State {
    fn find_mut(&mut self, id: CommentId) -> Option<&mut Comment> {
        self.posts
            .values_mut()
            .flat_map(|v| v.iter_mut())
            .find(|c| c.id == id)
    }

    fn author(&self, id: UserId) -> Author {
        self.authors
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Author::stub(id, &format!("user{}", id.0)))
    }

    fn insert(&mut self, c: NewComment) -> Comment {
        self.last_id += 1;
        let comment = Comment {
            id: CommentId(self.last_id),
            parent_id: c.parent_id,
            author: self.author(c.author_id),
            text: c.text,
            created_at: Utc::now(),
            liked_by: HashSet::new(),
        };
        self.posts
            .entry((c.post_owner_id, c.post_id))
            .or_insert_with(Vec::new)
            .push(comment.clone());
        comment
    }
}

/// In-memory comment backend
///
/// Clones share the same state, so tests can keep a handle to inspect what
/// the code under test did. Every call is journaled when it starts and when
/// it resolves, and each operation can be made slow or failing.
#[derive(Clone, Debug, Default)]
pub struct MockServer(Arc<Mutex<State>>);

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::default()
    }

    pub fn add_author(&self, a: Author) {
        self.0.lock().authors.insert(a.id, a);
    }

    /// Posts a comment without going through the journal
    pub fn test_post(
        &self,
        post_owner: UserId,
        post: PostId,
        author: UserId,
        text: &str,
        parent: Option<CommentId>,
    ) -> CommentId {
        self.0
            .lock()
            .insert(NewComment {
                post_owner_id: post_owner,
                post_id: post,
                author_id: author,
                text: String::from(text),
                parent_id: parent,
                reply_to_user: None,
            })
            .id
    }

    /// Removes a comment as if someone else deleted it, leaving its replies
    pub fn test_remove(&self, id: CommentId) {
        for comments in self.0.lock().posts.values_mut() {
            comments.retain(|c| c.id != id);
        }
    }

    pub fn test_set_likes(&self, id: CommentId, users: &[UserId]) {
        if let Some(c) = self.0.lock().find_mut(id) {
            c.liked_by = users.iter().copied().collect();
        }
    }

    pub fn comments_of(&self, post_owner: UserId, post: PostId) -> Vec<Comment> {
        self.0
            .lock()
            .posts
            .get(&(post_owner, post))
            .cloned()
            .unwrap_or_default()
    }

    pub fn comment(&self, id: CommentId) -> Option<Comment> {
        self.0.lock().find_mut(id).map(|c| c.clone())
    }

    pub fn journal(&self) -> Vec<Entry> {
        self.0.lock().journal.clone()
    }

    /// Calls in the order they were started
    pub fn calls(&self) -> Vec<Call> {
        self.0
            .lock()
            .journal
            .iter()
            .filter_map(|e| match e {
                Entry::Started(c) => Some(c.clone()),
                Entry::Resolved(_) => None,
            })
            .collect()
    }

    pub fn clear_journal(&self) {
        self.0.lock().journal.clear();
    }

    pub fn fail(&self, op: Op) {
        self.0.lock().failing.insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.0.lock().failing.remove(&op);
    }

    pub fn set_latency(&self, op: Op, latency: Duration) {
        self.0.lock().latency.insert(op, latency);
    }

    async fn enter(&self, call: Call) -> anyhow::Result<()> {
        let op = call.op();
        let latency = {
            let mut s = self.0.lock();
            s.journal.push(Entry::Started(call));
            s.latency.get(&op).copied()
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let mut s = self.0.lock();
        s.journal.push(Entry::Resolved(op));
        match s.failing.contains(&op) {
            true => Err(anyhow!("mock server failing {op:?} on purpose")),
            false => Ok(()),
        }
    }
}

#[async_trait]
impl CommentService for MockServer {
    async fn fetch(
        &mut self,
        post_owner: UserId,
        post: PostId,
        offset: usize,
    ) -> anyhow::Result<Vec<Comment>> {
        self.enter(Call::Fetch {
            post_owner,
            post,
            offset,
        })
        .await?;
        Ok(self
            .comments_of(post_owner, post)
            .into_iter()
            .skip(offset)
            .collect())
    }

    async fn create(&mut self, c: NewComment) -> anyhow::Result<Comment> {
        self.enter(Call::Create(c.clone())).await?;
        c.validate()?;
        Ok(self.0.lock().insert(c))
    }

    async fn exists(&mut self, c: CommentId) -> anyhow::Result<bool> {
        self.enter(Call::Exists(c)).await?;
        Ok(self.0.lock().find_mut(c).is_some())
    }

    async fn like(&mut self, c: CommentId, user: UserId) -> anyhow::Result<()> {
        self.enter(Call::Like(c, user)).await?;
        let mut s = self.0.lock();
        let comment = s.find_mut(c).ok_or(Error::NotFound(c))?;
        comment.liked_by.insert(user);
        Ok(())
    }

    async fn unlike(&mut self, c: CommentId, user: UserId) -> anyhow::Result<()> {
        self.enter(Call::Unlike(c, user)).await?;
        let mut s = self.0.lock();
        let comment = s.find_mut(c).ok_or(Error::NotFound(c))?;
        comment.liked_by.remove(&user);
        Ok(())
    }

    async fn delete(&mut self, c: CommentId) -> anyhow::Result<()> {
        self.enter(Call::Delete(c)).await?;
        self.test_remove(c);
        Ok(())
    }
}

/// Notifier keeping every message, for tests to assert on
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier(Arc<Mutex<Vec<String>>>);

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.0.lock().push(String::from(message));
    }
}
