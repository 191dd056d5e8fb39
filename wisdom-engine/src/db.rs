use std::collections::HashMap;

use crate::{
    api::{
        Article, ArticleId, ArticleLike, ArticleSort, ArticleWithStats, Comment, CommentId,
        CommentLike, CommentNode, Page, PageRequest, UserId,
    },
    build_forest, paginate, LikeTally, OrderExt,
};

/// Snapshot of the comments of one article and of their likes
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ThreadDump {
    pub article: ArticleId,

    /// In the order they were recorded
    pub comments: Vec<Comment>,

    pub likes: LikeTally<CommentId>,
}

impl ThreadDump {
    pub fn new(article: ArticleId, comments: Vec<Comment>, likes: &[CommentLike]) -> ThreadDump {
        ThreadDump {
            article,
            comments,
            likes: LikeTally::from_comment_likes(likes),
        }
    }

    pub fn like_count(&self, comment: &CommentId) -> usize {
        self.likes.count(comment)
    }

    /// Includes replies, even orphaned ones
    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// The whole reply forest, in recorded order
    pub fn tree(&self) -> Vec<CommentNode> {
        build_forest(&self.comments, &self.likes)
    }

    /// One page of the top-level comments, each with its replies
    pub fn feed(&self, req: &PageRequest) -> Page<CommentNode> {
        let mut roots = self.tree();
        req.mode.sort(&mut roots);
        paginate(roots, req, |n| n.id())
    }
}

/// Snapshot of all articles along with the data needed for their statistics
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArticleDump {
    /// In the order they were recorded
    pub articles: Vec<Article>,

    pub likes: LikeTally<ArticleId>,
    pub comment_counts: HashMap<ArticleId, usize>,
}

impl ArticleDump {
    pub fn new(
        articles: Vec<Article>,
        likes: &[ArticleLike],
        comment_counts: HashMap<ArticleId, usize>,
    ) -> ArticleDump {
        ArticleDump {
            articles,
            likes: LikeTally::from_article_likes(likes),
            comment_counts,
        }
    }

    fn with_stats(&self, a: &Article) -> ArticleWithStats {
        ArticleWithStats {
            article: a.clone(),
            like_count: self.likes.count(&a.id),
            comment_count: self.comment_counts.get(&a.id).copied().unwrap_or(0),
        }
    }

    fn sorted(
        &self,
        filter: impl Fn(&Article) -> bool,
        sort: ArticleSort,
    ) -> Vec<ArticleWithStats> {
        let mut res = self
            .articles
            .iter()
            .filter(|a| filter(a))
            .map(|a| self.with_stats(a))
            .collect::<Vec<_>>();
        sort.sort(&mut res);
        res
    }

    /// Articles whose title or content contain `query`, at most `limit` of them
    pub fn search(&self, query: &str, sort: ArticleSort, limit: usize) -> Vec<ArticleWithStats> {
        let mut res = self.sorted(|a| a.matches(query), sort);
        res.truncate(limit);
        res
    }

    /// The `n` newest articles
    pub fn top(&self, n: usize) -> Vec<Article> {
        let mut res = self.sorted(|_| true, ArticleSort::Recent);
        res.truncate(n);
        res.into_iter().map(|a| a.article).collect()
    }

    /// Newest first
    pub fn by_author(&self, author: &UserId) -> Vec<ArticleWithStats> {
        self.sorted(|a| a.author_id == *author, ArticleSort::Recent)
    }

    /// Articles among `liked`, newest first
    pub fn among(&self, liked: &[ArticleId]) -> Vec<ArticleWithStats> {
        self.sorted(|a| liked.contains(&a.id), ArticleSort::Recent)
    }
}
