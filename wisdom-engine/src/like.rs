use std::collections::{btree_map, BTreeMap, HashMap, HashSet};
use std::hash::Hash;

use crate::api::{ArticleId, ArticleLike, CommentId, CommentLike, LikeState, Time, UserId};

/// Number of distinct likers per liked item
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LikeTally<K: Eq + Hash>(HashMap<K, usize>);

impl<K: Copy + Eq + Hash> LikeTally<K> {
    pub fn empty() -> LikeTally<K> {
        LikeTally(HashMap::new())
    }

    /// Duplicate (item, user) pairs are only counted once
    pub fn from_pairs(pairs: impl IntoIterator<Item = (K, UserId)>) -> LikeTally<K> {
        let mut seen = HashSet::new();
        let mut counts = HashMap::new();
        for (k, user) in pairs {
            if seen.insert((k, user)) {
                *counts.entry(k).or_insert(0) += 1;
            }
        }
        LikeTally(counts)
    }

    pub fn count(&self, k: &K) -> usize {
        self.0.get(k).copied().unwrap_or(0)
    }
}

impl LikeTally<CommentId> {
    pub fn from_comment_likes<'a>(
        likes: impl IntoIterator<Item = &'a CommentLike>,
    ) -> LikeTally<CommentId> {
        LikeTally::from_pairs(likes.into_iter().map(|l| (l.comment_id, l.user_id)))
    }
}

impl LikeTally<ArticleId> {
    pub fn from_article_likes<'a>(
        likes: impl IntoIterator<Item = &'a ArticleLike>,
    ) -> LikeTally<ArticleId> {
        LikeTally::from_pairs(likes.into_iter().map(|l| (l.article_id, l.user_id)))
    }
}

/// A likes relation, unique on (item, user)
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LikeSet<K: Ord>(BTreeMap<(K, UserId), Time>);

impl<K: Copy + Eq + Hash + Ord> LikeSet<K> {
    pub fn new() -> LikeSet<K> {
        LikeSet(BTreeMap::new())
    }

    /// Removes the like if it exists, records it otherwise
    pub fn toggle(&mut self, item: K, user: UserId, now: Time) -> LikeState {
        match self.0.entry((item, user)) {
            btree_map::Entry::Occupied(e) => {
                e.remove();
                LikeState::Unliked
            }
            btree_map::Entry::Vacant(e) => {
                e.insert(now);
                LikeState::Liked
            }
        }
    }

    /// Returns true iff the like was not already there
    pub fn insert(&mut self, item: K, user: UserId, now: Time) -> bool {
        match self.0.entry((item, user)) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(e) => {
                e.insert(now);
                true
            }
        }
    }

    pub fn contains(&self, item: K, user: UserId) -> bool {
        self.0.contains_key(&(item, user))
    }

    /// Drops every like of any of `items`
    pub fn remove_items(&mut self, items: &HashSet<K>) {
        self.0.retain(|(k, _), _| !items.contains(k));
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, UserId, Time)> + '_ {
        self.0.iter().map(|((k, u), t)| (*k, *u, *t))
    }

    pub fn tally(&self) -> LikeTally<K> {
        LikeTally::from_pairs(self.0.keys().copied())
    }
}

impl<K: Copy + Eq + Hash + Ord> Default for LikeSet<K> {
    fn default() -> LikeSet<K> {
        LikeSet::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Uuid;

    fn user() -> UserId {
        UserId(Uuid::new_v4())
    }

    fn comment() -> CommentId {
        CommentId(Uuid::new_v4())
    }

    #[test]
    fn tally_counts_distinct_likers() {
        let (c1, c2) = (comment(), comment());
        let (u1, u2) = (user(), user());
        let now = chrono::Utc::now();
        let like = |comment_id, user_id| CommentLike {
            comment_id,
            user_id,
            date: now,
        };
        let likes = vec![like(c1, u1), like(c1, u2), like(c1, u1), like(c2, u2)];
        let tally = LikeTally::from_comment_likes(&likes);
        assert_eq!(tally.count(&c1), 2);
        assert_eq!(tally.count(&c2), 1);
        assert_eq!(tally.count(&comment()), 0);
    }

    #[test]
    fn toggle_like_then_unlike() {
        let mut likes = LikeSet::new();
        let (c1, u1) = (comment(), user());
        let now = chrono::Utc::now();
        assert_eq!(likes.tally().count(&c1), 0);
        assert_eq!(likes.toggle(c1, u1, now), LikeState::Liked);
        assert_eq!(likes.tally().count(&c1), 1);
        assert!(likes.contains(c1, u1));
        assert_eq!(likes.toggle(c1, u1, now), LikeState::Unliked);
        assert_eq!(likes.tally().count(&c1), 0);
        assert!(!likes.contains(c1, u1));
    }

    #[test]
    fn insert_is_idempotent() {
        let mut likes = LikeSet::new();
        let (c1, u1) = (comment(), user());
        let now = chrono::Utc::now();
        assert!(likes.insert(c1, u1, now));
        assert!(!likes.insert(c1, u1, now));
        assert_eq!(likes.tally().count(&c1), 1);
    }

    #[test]
    fn remove_items_only_touches_given_items() {
        let mut likes = LikeSet::new();
        let (c1, c2, u1) = (comment(), comment(), user());
        let now = chrono::Utc::now();
        likes.insert(c1, u1, now);
        likes.insert(c2, u1, now);
        likes.remove_items(&[c1].into_iter().collect());
        assert!(!likes.contains(c1, u1));
        assert!(likes.contains(c2, u1));
    }

    #[test]
    fn fuzz_double_toggle_is_identity() {
        bolero::check!()
            .with_type::<(Vec<(u8, u8)>, u8, u8)>()
            .for_each(|(initial, item, user)| {
                let users = (0..=u8::MAX)
                    .map(|i| UserId(Uuid::from_u128(i as u128)))
                    .collect::<Vec<_>>();
                let now = chrono::Utc::now();
                let mut likes = LikeSet::new();
                for (i, u) in initial {
                    likes.insert(*i, users[*u as usize], now);
                }
                let before = likes.clone();
                let first = likes.toggle(*item, users[*user as usize], now);
                let second = likes.toggle(*item, users[*user as usize], now);
                assert_ne!(first, second);
                assert_eq!(likes.tally(), before.tally());
                assert_eq!(likes, before);
            })
    }
}
