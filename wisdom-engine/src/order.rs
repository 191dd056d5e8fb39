use std::cmp::Reverse;

use crate::api::{
    ArticleSort, ArticleWithStats, CommentId, CommentNode, FeedMode, Page, PageRequest,
};

pub trait OrderExt<T> {
    /// Expects `items` in the order they were recorded. The resulting order is
    /// total, so that it can be paginated with cursors.
    fn sort(&self, items: &mut Vec<T>);
}

/// Sorts `items` by `key`, breaking ties by putting the last recorded first
fn sort_later_recorded_first<T, K: Ord>(items: &mut Vec<T>, key: impl Fn(&T) -> K) {
    let mut keyed = std::mem::take(items)
        .into_iter()
        .enumerate()
        .collect::<Vec<_>>();
    keyed.sort_unstable_by(|(ia, a), (ib, b)| key(a).cmp(&key(b)).then(ib.cmp(ia)));
    items.extend(keyed.into_iter().map(|(_, t)| t));
}

impl OrderExt<CommentNode> for FeedMode {
    fn sort(&self, roots: &mut Vec<CommentNode>) {
        match self {
            FeedMode::Recent => sort_later_recorded_first(roots, |n| Reverse(n.comment.date)),
            FeedMode::Liked => roots.sort_unstable_by_key(|n| {
                (Reverse(n.like_count), Reverse(n.comment.date), n.comment.id)
            }),
        }
    }
}

impl OrderExt<ArticleWithStats> for ArticleSort {
    fn sort(&self, articles: &mut Vec<ArticleWithStats>) {
        match self {
            ArticleSort::Recent => {
                sort_later_recorded_first(articles, |a| Reverse(a.article.date))
            }
            ArticleSort::Liked => articles.sort_unstable_by_key(|a| {
                (Reverse(a.like_count), Reverse(a.article.date), a.article.id)
            }),
        }
    }
}

/// Cuts the page described by `req` out of the fully-ordered `items`.
///
/// A cursor that is not in `items` (eg. because its comment was deleted)
/// restarts the feed from the beginning.
pub fn paginate<T>(items: Vec<T>, req: &PageRequest, id_of: impl Fn(&T) -> CommentId) -> Page<T> {
    let start = match req.cursor {
        None => 0,
        Some(cursor) => match items.iter().position(|t| id_of(t) == cursor) {
            Some(pos) => pos + 1,
            None => {
                tracing::debug!(?cursor, "unknown feed cursor, restarting from the beginning");
                0
            }
        },
    };
    let items = items
        .into_iter()
        .skip(start)
        .take(req.limit)
        .collect::<Vec<_>>();
    let next_cursor = match items.last() {
        Some(last) if items.len() == req.limit => Some(id_of(last)),
        _ => None,
    };
    Page { items, next_cursor }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::api::{Article, ArticleId, Comment, Time, UserId, Uuid};

    fn at(secs: i64) -> Time {
        chrono::Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn id(n: u128) -> CommentId {
        CommentId(Uuid::from_u128(n))
    }

    fn node(n: u128, date: i64, like_count: usize) -> CommentNode {
        CommentNode {
            comment: Comment {
                id: id(n),
                article_id: ArticleId::stub(),
                author_id: UserId::stub(),
                author_name: String::from("someone"),
                content: format!("comment {n}"),
                date: at(date),
                parent_id: None,
            },
            like_count,
            depth: 0,
            children: Vec::new(),
        }
    }

    fn ids(nodes: &[CommentNode]) -> Vec<CommentId> {
        nodes.iter().map(|n| n.id()).collect()
    }

    #[test]
    fn recent_is_newest_first() {
        let mut roots = vec![node(1, 100, 2), node(2, 200, 5), node(3, 150, 9)];
        FeedMode::Recent.sort(&mut roots);
        assert_eq!(ids(&roots), vec![id(2), id(3), id(1)]);
    }

    #[test]
    fn recent_ties_put_last_recorded_first() {
        let mut roots = vec![node(3, 100, 0), node(1, 100, 0), node(2, 100, 0)];
        FeedMode::Recent.sort(&mut roots);
        assert_eq!(ids(&roots), vec![id(2), id(1), id(3)]);
    }

    #[test]
    fn liked_breaks_ties_by_date_then_id() {
        let mut roots = vec![
            node(4, 100, 1),
            node(3, 300, 1),
            node(2, 200, 7),
            node(1, 100, 1),
        ];
        FeedMode::Liked.sort(&mut roots);
        assert_eq!(ids(&roots), vec![id(2), id(3), id(1), id(4)]);

        // same result whatever the input order
        roots.reverse();
        FeedMode::Liked.sort(&mut roots);
        assert_eq!(ids(&roots), vec![id(2), id(3), id(1), id(4)]);
    }

    #[test]
    fn articles_sort_by_likes_then_date() {
        let article = |n: u128, date: i64, like_count: usize| ArticleWithStats {
            article: Article {
                id: ArticleId(Uuid::from_u128(n)),
                author_id: UserId::stub(),
                author_name: String::from("someone"),
                date: at(date),
                title: format!("article {n}"),
                content: String::new(),
                tags: Vec::new(),
            },
            like_count,
            comment_count: 0,
        };
        let mut articles = vec![article(1, 100, 3), article(2, 200, 1), article(3, 300, 3)];
        ArticleSort::Liked.sort(&mut articles);
        let order = articles.iter().map(|a| a.article.id.0.as_u128()).collect::<Vec<_>>();
        assert_eq!(order, vec![3, 1, 2]);
        ArticleSort::Recent.sort(&mut articles);
        let order = articles.iter().map(|a| a.article.id.0.as_u128()).collect::<Vec<_>>();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn pages_follow_the_cursor() {
        let items = (1..=5).map(|n| node(n, 0, 0)).collect::<Vec<_>>();
        let req = PageRequest::first(FeedMode::Recent, 2);

        let page = paginate(items.clone(), &req, |n| n.id());
        assert_eq!(ids(&page.items), vec![id(1), id(2)]);
        assert_eq!(page.next_cursor, Some(id(2)));

        let req = req.after(&page).unwrap();
        let page = paginate(items.clone(), &req, |n| n.id());
        assert_eq!(ids(&page.items), vec![id(3), id(4)]);

        let req = req.after(&page).unwrap();
        let page = paginate(items.clone(), &req, |n| n.id());
        assert_eq!(ids(&page.items), vec![id(5)]);
        assert_eq!(page.next_cursor, None);
        assert_eq!(req.after(&page), None);
    }

    #[test]
    fn exactly_full_last_page_is_followed_by_an_empty_one() {
        let items = (1..=4).map(|n| node(n, 0, 0)).collect::<Vec<_>>();
        let req = PageRequest {
            mode: FeedMode::Recent,
            limit: 2,
            cursor: Some(id(2)),
        };
        let page = paginate(items.clone(), &req, |n| n.id());
        assert_eq!(page.next_cursor, Some(id(4)));
        let page = paginate(items, &req.after(&page).unwrap(), |n| n.id());
        assert!(page.items.is_empty());
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn unknown_cursor_restarts_from_the_beginning() {
        let items = (1..=3).map(|n| node(n, 0, 0)).collect::<Vec<_>>();
        let req = PageRequest {
            mode: FeedMode::Liked,
            limit: 10,
            cursor: Some(id(42)),
        };
        let page = paginate(items, &req, |n| n.id());
        assert_eq!(ids(&page.items), vec![id(1), id(2), id(3)]);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let items = (1..=3).map(|n| node(n, 0, 0)).collect::<Vec<_>>();
        let page = paginate(items, &PageRequest::first(FeedMode::Recent, 0), |n| n.id());
        assert!(page.items.is_empty());
        assert_eq!(page.next_cursor, None);
    }
}
