use std::collections::HashSet;

use crate::api::UserId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LikeIntent {
    Like,
    Unlike,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Idle,

    /// Waiting for the server to confirm the comment still exists
    Checking { user: UserId, intent: LikeIntent },

    /// Shown optimistically, waiting for the like or unlike call
    Pending { user: UserId, intent: LikeIntent },
}

/// Local mirror of the set of users who liked a comment
///
/// `shown` is what the user sees, `confirmed` is the last value known to be
/// on the server. They only differ while a toggle is pending. At most one
/// toggle is in flight at a time: `begin` refuses to start another one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LikeState {
    confirmed: HashSet<UserId>,
    shown: HashSet<UserId>,
    phase: Phase,
}

impl LikeState {
    pub fn new(liked_by: &HashSet<UserId>) -> LikeState {
        LikeState {
            confirmed: liked_by.clone(),
            shown: liked_by.clone(),
            phase: Phase::Idle,
        }
    }

    pub fn liked_by(&self) -> &HashSet<UserId> {
        &self.shown
    }

    pub fn count(&self) -> usize {
        self.shown.len()
    }

    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.shown.contains(user)
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Whether the displayed state is ahead of the server
    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Pending { .. })
    }

    pub fn begin(&mut self, user: UserId) -> Option<LikeIntent> {
        if self.phase != Phase::Idle {
            return None;
        }
        let intent = match self.shown.contains(&user) {
            true => LikeIntent::Unlike,
            false => LikeIntent::Like,
        };
        self.phase = Phase::Checking { user, intent };
        Some(intent)
    }

    /// Gives up on the toggle before anything was shown
    pub fn abort(&mut self) {
        match self.phase {
            Phase::Checking { .. } => self.phase = Phase::Idle,
            phase => tracing::warn!(?phase, "aborting a like toggle that is not being checked"),
        }
    }

    pub fn apply(&mut self) {
        match self.phase {
            Phase::Checking { user, intent } => {
                apply_intent(&mut self.shown, user, intent);
                self.phase = Phase::Pending { user, intent };
            }
            phase => tracing::warn!(?phase, "applying a like toggle that is not being checked"),
        }
    }

    /// Ends a pending toggle, rolling the shown state back if the server
    /// call failed
    pub fn settle(&mut self, success: bool) {
        match self.phase {
            Phase::Pending { user, intent } => {
                match success {
                    true => apply_intent(&mut self.confirmed, user, intent),
                    false => self.shown = self.confirmed.clone(),
                }
                self.phase = Phase::Idle;
            }
            phase => tracing::warn!(?phase, "settling a like toggle that is not pending"),
        }
    }

    /// Takes a fresh value from the server, keeping any pending toggle shown
    /// on top of it
    pub fn sync(&mut self, liked_by: &HashSet<UserId>) {
        self.confirmed = liked_by.clone();
        self.shown = liked_by.clone();
        if let Phase::Pending { user, intent } = self.phase {
            apply_intent(&mut self.shown, user, intent);
        }
    }
}

fn apply_intent(set: &mut HashSet<UserId>, user: UserId, intent: LikeIntent) {
    match intent {
        LikeIntent::Like => set.insert(user),
        LikeIntent::Unlike => set.remove(&user),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(ids: &[i64]) -> HashSet<UserId> {
        ids.iter().copied().map(UserId).collect()
    }

    #[test]
    fn unlike_is_shown_before_server_answers() {
        let mut s = LikeState::new(&users(&[5]));
        assert_eq!(s.begin(UserId(5)), Some(LikeIntent::Unlike));
        assert!(s.is_liked_by(&UserId(5)));
        s.apply();
        assert!(s.is_pending());
        assert_eq!(s.liked_by(), &users(&[]));
        assert_eq!(s.count(), 0);
        s.settle(true);
        assert!(!s.is_busy());
        assert!(!s.is_liked_by(&UserId(5)));
    }

    #[test]
    fn like_adds_current_user() {
        let mut s = LikeState::new(&users(&[1, 2]));
        assert_eq!(s.begin(UserId(5)), Some(LikeIntent::Like));
        s.apply();
        assert_eq!(s.count(), 3);
        s.settle(true);
        assert_eq!(s.liked_by(), &users(&[1, 2, 5]));
    }

    #[test]
    fn second_tap_while_in_flight_is_refused() {
        let mut s = LikeState::new(&users(&[]));
        assert_eq!(s.begin(UserId(5)), Some(LikeIntent::Like));
        assert_eq!(s.begin(UserId(5)), None);
        s.apply();
        assert_eq!(s.begin(UserId(5)), None);
        assert_eq!(s.liked_by(), &users(&[5]));
        s.settle(true);
        assert_eq!(s.begin(UserId(5)), Some(LikeIntent::Unlike));
    }

    #[test]
    fn abort_leaves_membership_alone() {
        let mut s = LikeState::new(&users(&[5]));
        s.begin(UserId(5));
        s.abort();
        assert!(!s.is_busy());
        assert_eq!(s.liked_by(), &users(&[5]));
    }

    #[test]
    fn failure_rolls_back() {
        // Deliberately stricter than just leaving the optimistic value shown
        let mut s = LikeState::new(&users(&[3]));
        s.begin(UserId(5));
        s.apply();
        assert_eq!(s.liked_by(), &users(&[3, 5]));
        s.settle(false);
        assert_eq!(s.liked_by(), &users(&[3]));
        assert!(!s.is_busy());
    }

    #[test]
    fn sync_keeps_pending_toggle_on_top() {
        let mut s = LikeState::new(&users(&[]));
        s.begin(UserId(5));
        s.apply();
        s.sync(&users(&[8]));
        assert_eq!(s.liked_by(), &users(&[5, 8]));
        s.settle(false);
        assert_eq!(s.liked_by(), &users(&[8]));
    }

    #[test]
    fn sync_when_idle_replaces_everything() {
        let mut s = LikeState::new(&users(&[1]));
        s.sync(&users(&[2, 3]));
        assert_eq!(s.liked_by(), &users(&[2, 3]));
        assert!(!s.is_busy());
    }
}
