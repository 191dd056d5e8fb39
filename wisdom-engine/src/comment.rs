use std::collections::{HashMap, HashSet};

use crate::{
    api::{Comment, CommentId, CommentNode},
    LikeTally,
};

struct Links<'a> {
    comments: &'a [Comment],

    /// Index of each kept comment, deduplicated by id
    by_id: HashMap<CommentId, usize>,

    /// Indices of the direct replies to each comment, in recorded order
    children: HashMap<CommentId, Vec<usize>>,

    roots: Vec<usize>,
}

impl<'a> Links<'a> {
    fn new(comments: &'a [Comment]) -> Links<'a> {
        let mut by_id = HashMap::with_capacity(comments.len());
        let mut kept = Vec::with_capacity(comments.len());
        for (i, c) in comments.iter().enumerate() {
            if by_id.contains_key(&c.id) {
                tracing::warn!(comment = ?c.id, "ignoring duplicate comment in snapshot");
                continue;
            }
            by_id.insert(c.id, i);
            kept.push(i);
        }

        let mut children = HashMap::<CommentId, Vec<usize>>::new();
        let mut roots = Vec::new();
        for i in kept {
            let c = &comments[i];
            match c.parent_id {
                None => roots.push(i),
                Some(parent) if by_id.contains_key(&parent) => {
                    children.entry(parent).or_default().push(i)
                }
                Some(parent) => {
                    tracing::debug!(comment = ?c.id, ?parent, "dropping orphaned reply");
                }
            }
        }

        Links {
            comments,
            by_id,
            children,
            roots,
        }
    }

    fn leaf(&self, i: usize, depth: usize, likes: &LikeTally<CommentId>) -> CommentNode {
        let comment = &self.comments[i];
        CommentNode {
            comment: comment.clone(),
            like_count: likes.count(&comment.id),
            depth,
            children: Vec::new(),
        }
    }

    fn kids(&self, i: usize) -> &[usize] {
        self.children
            .get(&self.comments[i].id)
            .map(|k| &k[..])
            .unwrap_or(&[])
    }

    /// Builds the subtree of `root` bottom-up, with an explicit stack so that
    /// reply chains of any depth fit
    fn node(&self, root: usize, likes: &LikeTally<CommentId>) -> CommentNode {
        // each frame is a node under construction and the next of its kids to visit
        let mut stack = vec![(self.leaf(root, 0, likes), root, 0)];
        loop {
            let (node, i, next) = stack.last_mut().expect("stack holds at least the root");
            if let Some(&k) = self.kids(*i).get(*next) {
                *next += 1;
                let depth = node.depth + 1;
                stack.push((self.leaf(k, depth, likes), k, 0));
                continue;
            }
            let (done, _, _) = stack.pop().expect("stack holds at least the root");
            match stack.last_mut() {
                Some((parent, _, _)) => parent.children.push(done),
                None => return done,
            }
        }
    }
}

/// Builds the reply forest of the comments of one article.
///
/// Roots and siblings keep the relative order of `comments`. Replies whose
/// parent is not part of `comments` are dropped along with their own replies,
/// so that a concurrent deletion never yields a partial tree.
pub fn build_forest(comments: &[Comment], likes: &LikeTally<CommentId>) -> Vec<CommentNode> {
    let links = Links::new(comments);
    links
        .roots
        .iter()
        .map(|&r| links.node(r, likes))
        .collect()
}

/// Same as `build_forest`, with all like counts at 0
pub fn build_tree(comments: &[Comment]) -> Vec<CommentNode> {
    build_forest(comments, &LikeTally::empty())
}

/// Ids of all the replies, direct or not, to `root`
pub fn descendants_of(comments: &[Comment], root: &CommentId) -> Vec<CommentId> {
    let links = Links::new(comments);
    if !links.by_id.contains_key(root) {
        return Vec::new();
    }
    let mut res = Vec::new();
    let mut seen = HashSet::new();
    seen.insert(*root);
    let mut todo = vec![*root];
    while let Some(c) = todo.pop() {
        for &k in links.children.get(&c).into_iter().flatten() {
            let kid = links.comments[k].id;
            if seen.insert(kid) {
                res.push(kid);
                todo.push(kid);
            }
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use bolero::generator::TypeGenerator;
    use chrono::TimeZone;

    use super::*;
    use crate::api::{ArticleId, Time, UserId, Uuid};

    fn at(secs: i64) -> Time {
        chrono::Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn id(n: u128) -> CommentId {
        CommentId(Uuid::from_u128(n))
    }

    fn comment(n: u128, date: i64, parent: Option<u128>) -> Comment {
        Comment {
            id: id(n),
            article_id: ArticleId::stub(),
            author_id: UserId::stub(),
            author_name: String::from("someone"),
            content: format!("comment {n}"),
            date: at(date),
            parent_id: parent.map(id),
        }
    }

    fn ids(nodes: &[CommentNode]) -> Vec<CommentId> {
        nodes.iter().map(|n| n.id()).collect()
    }

    #[test]
    fn reply_is_attached_under_its_parent() {
        let comments = vec![
            comment(1, 100, None),
            comment(2, 200, None),
            comment(3, 150, Some(1)),
        ];
        let forest = build_tree(&comments);
        assert_eq!(ids(&forest), vec![id(1), id(2)]);
        assert_eq!(ids(&forest[0].children), vec![id(3)]);
        assert_eq!(forest[0].children[0].depth, 1);
        assert!(forest[1].children.is_empty());
    }

    #[test]
    fn reply_recorded_before_its_parent_is_still_attached() {
        let comments = vec![
            comment(3, 300, Some(2)),
            comment(2, 200, Some(1)),
            comment(1, 100, None),
        ];
        let forest = build_tree(&comments);
        assert_eq!(ids(&forest), vec![id(1)]);
        let reply = &forest[0].children[0];
        assert_eq!(reply.id(), id(2));
        assert_eq!(reply.depth, 1);
        assert_eq!(reply.children[0].id(), id(3));
        assert_eq!(reply.children[0].depth, 2);
        assert_eq!(CommentNode::find_in(&forest, &id(3)).map(|n| n.depth), Some(2));
    }

    #[test]
    fn orphans_are_dropped_with_their_replies() {
        let comments = vec![
            comment(1, 100, None),
            comment(2, 200, Some(42)),
            comment(3, 300, Some(2)),
            comment(4, 400, Some(1)),
        ];
        let forest = build_tree(&comments);
        assert_eq!(ids(&forest), vec![id(1)]);
        assert_eq!(ids(&forest[0].children), vec![id(4)]);
        assert!(CommentNode::find_in(&forest, &id(2)).is_none());
        assert!(CommentNode::find_in(&forest, &id(3)).is_none());
    }

    #[test]
    fn like_counts_are_filled_in() {
        let comments = vec![comment(1, 100, None), comment(2, 200, Some(1))];
        let (u1, u2) = (UserId(Uuid::from_u128(1)), UserId(Uuid::from_u128(2)));
        let likes = LikeTally::from_pairs(vec![(id(1), u1), (id(1), u2), (id(2), u1)]);
        let forest = build_forest(&comments, &likes);
        assert_eq!(forest[0].like_count, 2);
        assert_eq!(forest[0].children[0].like_count, 1);
    }

    #[test]
    fn descendants_cover_the_whole_subtree() {
        let comments = vec![
            comment(1, 100, None),
            comment(2, 200, Some(1)),
            comment(3, 300, Some(2)),
            comment(4, 400, Some(1)),
            comment(5, 500, None),
            comment(6, 600, Some(5)),
        ];
        let mut desc = descendants_of(&comments, &id(1));
        desc.sort();
        assert_eq!(desc, vec![id(2), id(3), id(4)]);
        assert_eq!(descendants_of(&comments, &id(3)), Vec::new());
        assert_eq!(descendants_of(&comments, &id(42)), Vec::new());
    }

    #[test]
    fn cycles_are_never_reached() {
        let comments = vec![
            comment(1, 100, None),
            comment(2, 200, Some(3)),
            comment(3, 300, Some(2)),
            comment(4, 400, Some(4)),
        ];
        let forest = build_tree(&comments);
        assert_eq!(ids(&forest), vec![id(1)]);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn deep_reply_chains_are_built_whole() {
        const DEPTH: u128 = 20_000;
        let comments = (0..DEPTH)
            .map(|n| comment(n, n as i64, n.checked_sub(1)))
            .collect::<Vec<_>>();
        let likes = LikeTally::from_pairs(vec![(id(DEPTH - 1), UserId::stub())]);
        let forest = build_forest(&comments, &likes);
        assert_eq!(ids(&forest), vec![id(0)]);

        let mut node = &forest[0];
        while let Some(kid) = node.children.first() {
            assert_eq!(node.children.len(), 1);
            assert_eq!(kid.depth, node.depth + 1);
            node = kid;
        }
        assert_eq!(node.id(), id(DEPTH - 1));
        assert_eq!(node.depth, DEPTH as usize - 1);
        assert_eq!(node.like_count, 1);

        let found = CommentNode::find_in(&forest, &id(DEPTH - 1));
        assert_eq!(found.map(|n| n.depth), Some(DEPTH as usize - 1));
        assert!(CommentNode::find_in(&forest, &id(DEPTH)).is_none());
        drop(forest);
    }

    #[derive(Clone, Debug, TypeGenerator)]
    struct FuzzComment {
        parent: Option<u8>,
        date: u8,
    }

    fn check_subtree(node: &CommentNode, depth: usize, seen: &mut HashSet<CommentId>) {
        assert_eq!(node.depth, depth);
        assert!(seen.insert(node.id()), "comment {:?} seen twice", node.id());
        for kid in &node.children {
            assert_eq!(kid.comment.parent_id, Some(node.id()));
            check_subtree(kid, depth + 1, seen);
        }
    }

    #[test]
    fn fuzz_forest_is_a_partition() {
        bolero::check!()
            .with_type::<Vec<FuzzComment>>()
            .for_each(|fuzz| {
                // ids are the positions, so the only anomalies are orphans and cycles
                let comments = fuzz
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        comment(
                            i as u128,
                            c.date as i64,
                            c.parent.map(|p| p as u128).filter(|p| *p != i as u128),
                        )
                    })
                    .collect::<Vec<_>>();
                let forest = build_tree(&comments);
                let mut seen = HashSet::new();
                for root in &forest {
                    assert!(root.comment.is_top_level());
                    check_subtree(root, 0, &mut seen);
                }

                // a comment is in the forest iff its chain of parents ends at a root
                let by_id = comments
                    .iter()
                    .map(|c| (c.id, c))
                    .collect::<HashMap<_, _>>();
                for c in &comments {
                    let mut cur = c;
                    let mut steps = 0;
                    let reachable = loop {
                        match cur.parent_id {
                            None => break true,
                            Some(p) => match by_id.get(&p) {
                                None => break false,
                                Some(p) => cur = p,
                            },
                        }
                        steps += 1;
                        if steps > comments.len() {
                            break false;
                        }
                    };
                    assert_eq!(seen.contains(&c.id), reachable, "comment {:?}", c.id);
                }
            })
    }
}
