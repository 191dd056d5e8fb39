use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use wisdom_engine::{
    api::{
        Article, ArticleId, ArticleLike, Comment, CommentId, CommentLike, CommentStore, Error,
        LikeState, LikeStore, NewArticle, NewComment, Notification, NotificationKind,
        NotificationSink, User, UserId, Uuid,
    },
    descendants_of, ArticleDump, LikeSet, ThreadDump,
};

mod inbox;
pub use inbox::Inbox;

/// Senders of every open notification feed
#[derive(Debug, Default)]
pub struct NotificationFeeds(Vec<mpsc::UnboundedSender<Notification>>);

impl NotificationFeeds {
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Notification> {
        self.0.retain(|f| !f.is_closed());
        let (sender, receiver) = mpsc::unbounded_channel();
        self.0.push(sender);
        receiver
    }
}

impl NotificationSink for NotificationFeeds {
    fn notify(&self, n: Notification) {
        for f in &self.0 {
            // a closed feed just misses the notification
            let _ = f.send(n.clone());
        }
    }
}

/// In-memory users, articles, comments and likes.
///
/// Every write first checks all its preconditions, so a failed write leaves
/// the store untouched. Notifications resulting from a write are sent to the
/// feeds after the write is done.
#[derive(Debug, Default)]
pub struct MemStore {
    users: BTreeMap<UserId, User>,

    /// In the order they were recorded
    articles: Vec<Article>,

    /// Comments of each article, in the order they were recorded
    comments: HashMap<ArticleId, Vec<Comment>>,
    comment_articles: HashMap<CommentId, ArticleId>,

    comment_likes: LikeSet<CommentId>,
    article_likes: LikeSet<ArticleId>,

    feeds: NotificationFeeds,
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }

    pub fn notification_feed(&mut self) -> mpsc::UnboundedReceiver<Notification> {
        self.feeds.subscribe()
    }

    fn display_name(&self, user: &UserId) -> String {
        self.users
            .get(user)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| String::from(User::ANONYMOUS))
    }

    fn notify(
        &self,
        actor: UserId,
        recipient: UserId,
        kind: NotificationKind,
        article: ArticleId,
        comment: Option<CommentId>,
    ) {
        let sender_name = self.display_name(&actor);
        if let Some(n) =
            Notification::new(actor, recipient, kind, article, comment, sender_name, Utc::now())
        {
            tracing::debug!(recipient = ?n.recipient_id, kind = ?n.kind, "emitting notification");
            self.feeds.notify(n);
        }
    }

    /// Records the user if it is not known yet, never overwrites
    pub fn sync_user(&mut self, u: User) -> Result<(), Error> {
        u.validate()?;
        self.users.entry(u.id).or_insert(u);
        Ok(())
    }

    /// Overwrites a known user, ignores unknown ones
    pub fn update_user(&mut self, u: User) -> Result<(), Error> {
        u.validate()?;
        if let Some(known) = self.users.get_mut(&u.id) {
            *known = u;
        }
        Ok(())
    }

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn create_article(&mut self, actor: UserId, a: NewArticle) -> Result<ArticleId, Error> {
        a.validate()?;
        let id = ArticleId(Uuid::new_v4());
        self.articles.push(Article {
            id,
            author_id: actor,
            author_name: self.display_name(&actor),
            date: Utc::now(),
            title: a.title,
            content: a.content,
            tags: a.tags,
        });
        Ok(id)
    }

    pub fn article(&self, id: &ArticleId) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == *id)
    }

    /// Also deletes all the comments of the article and all the likes
    pub fn delete_article(&mut self, actor: UserId, id: ArticleId) -> Result<(), Error> {
        let article = self.article(&id).ok_or(Error::ArticleNotFound(id))?;
        if article.author_id != actor {
            return Err(Error::PermissionDenied);
        }
        let comments = self
            .comments
            .remove(&id)
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.id)
            .collect::<HashSet<_>>();
        for c in &comments {
            self.comment_articles.remove(c);
        }
        self.comment_likes.remove_items(&comments);
        self.article_likes.remove_items(&[id].into_iter().collect());
        self.articles.retain(|a| a.id != id);
        tracing::debug!(article = ?id, num_comments = comments.len(), "deleted article");
        Ok(())
    }

    /// Returns true iff the article was not already liked by `actor`
    pub fn like_article(&mut self, actor: UserId, id: ArticleId) -> Result<bool, Error> {
        let author = self.article(&id).ok_or(Error::ArticleNotFound(id))?.author_id;
        let newly_liked = self.article_likes.insert(id, actor, Utc::now());
        if newly_liked {
            self.notify(actor, author, NotificationKind::ArticleLike, id, None);
        }
        Ok(newly_liked)
    }

    pub fn has_liked_article(&self, actor: UserId, id: ArticleId) -> bool {
        self.article_likes.contains(id, actor)
    }

    pub fn article_like_count(&self, id: &ArticleId) -> usize {
        self.article_likes.tally().count(id)
    }

    /// Articles liked by `user`
    pub fn liked_articles(&self, user: &UserId) -> Vec<ArticleId> {
        self.article_likes
            .iter()
            .filter(|(_, u, _)| u == user)
            .map(|(a, _, _)| a)
            .collect()
    }

    pub fn article_dump(&self) -> ArticleDump {
        let likes = self
            .article_likes
            .iter()
            .map(|(article_id, user_id, date)| ArticleLike {
                article_id,
                user_id,
                date,
            })
            .collect::<Vec<_>>();
        let comment_counts = self
            .comments
            .iter()
            .map(|(a, comments)| (*a, comments.len()))
            .collect();
        ArticleDump::new(self.articles.clone(), &likes, comment_counts)
    }

    fn comments_of(&self, article: &ArticleId) -> &[Comment] {
        self.comments.get(article).map(|c| &c[..]).unwrap_or(&[])
    }

    fn comment(&self, id: &CommentId) -> Option<&Comment> {
        let article = self.comment_articles.get(id)?;
        self.comments_of(article).iter().find(|c| c.id == *id)
    }

    fn likes_of(&self, article: &ArticleId) -> Vec<CommentLike> {
        let comments = self
            .comments_of(article)
            .iter()
            .map(|c| c.id)
            .collect::<HashSet<_>>();
        self.comment_likes
            .iter()
            .filter(|(c, _, _)| comments.contains(c))
            .map(|(comment_id, user_id, date)| CommentLike {
                comment_id,
                user_id,
                date,
            })
            .collect()
    }

    pub fn thread(&self, article: ArticleId) -> Result<ThreadDump, Error> {
        if self.article(&article).is_none() {
            return Err(Error::ArticleNotFound(article));
        }
        Ok(ThreadDump::new(
            article,
            self.comments_of(&article).to_vec(),
            &self.likes_of(&article),
        ))
    }

    pub fn add_comment(&mut self, actor: UserId, c: NewComment) -> Result<CommentId, Error> {
        c.validate()?;
        let article_author = self
            .article(&c.article_id)
            .ok_or(Error::ArticleNotFound(c.article_id))?
            .author_id;
        let parent_author = match c.parent_id {
            None => None,
            Some(parent) => Some(
                self.comment(&parent)
                    .filter(|p| p.article_id == c.article_id)
                    .ok_or(Error::ParentNotFound(parent))?
                    .author_id,
            ),
        };

        let id = CommentId(Uuid::new_v4());
        let comment = Comment {
            id,
            article_id: c.article_id,
            author_id: actor,
            author_name: self.display_name(&actor),
            content: c.content,
            date: Utc::now(),
            parent_id: c.parent_id,
        };
        self.comments
            .entry(c.article_id)
            .or_insert_with(Vec::new)
            .push(comment);
        self.comment_articles.insert(id, c.article_id);

        match parent_author {
            None => self.notify(
                actor,
                article_author,
                NotificationKind::Comment,
                c.article_id,
                Some(id),
            ),
            Some(parent_author) => self.notify(
                actor,
                parent_author,
                NotificationKind::Reply,
                c.article_id,
                Some(id),
            ),
        }
        Ok(id)
    }

    /// Deletes the comment along with all its replies and their likes
    pub fn remove_comment(&mut self, actor: UserId, id: CommentId) -> Result<(), Error> {
        let comment = self.comment(&id).ok_or(Error::CommentNotFound(id))?;
        if comment.author_id != actor {
            return Err(Error::PermissionDenied);
        }
        let article = comment.article_id;
        let mut deleted = descendants_of(self.comments_of(&article), &id)
            .into_iter()
            .collect::<HashSet<_>>();
        deleted.insert(id);
        if let Some(comments) = self.comments.get_mut(&article) {
            comments.retain(|c| !deleted.contains(&c.id));
        }
        for c in &deleted {
            self.comment_articles.remove(c);
        }
        self.comment_likes.remove_items(&deleted);
        tracing::debug!(comment = ?id, num_deleted = deleted.len(), "deleted comment");
        Ok(())
    }

    pub fn toggle_like(&mut self, actor: UserId, id: CommentId) -> Result<LikeState, Error> {
        let comment = self.comment(&id).ok_or(Error::CommentNotFound(id))?;
        let (author, article) = (comment.author_id, comment.article_id);
        let state = self.comment_likes.toggle(id, actor, Utc::now());
        if state == LikeState::Liked {
            self.notify(
                actor,
                author,
                NotificationKind::CommentLike,
                article,
                Some(id),
            );
        }
        Ok(state)
    }
}

#[async_trait]
impl CommentStore for MemStore {
    async fn list_comments(&mut self, article: ArticleId) -> anyhow::Result<Vec<Comment>> {
        Ok(self.comments_of(&article).to_vec())
    }

    async fn insert_comment(
        &mut self,
        actor: UserId,
        comment: NewComment,
    ) -> anyhow::Result<Result<CommentId, Error>> {
        Ok(self.add_comment(actor, comment))
    }

    async fn delete_comment(
        &mut self,
        actor: UserId,
        comment: CommentId,
    ) -> anyhow::Result<Result<(), Error>> {
        Ok(self.remove_comment(actor, comment))
    }
}

#[async_trait]
impl LikeStore for MemStore {
    async fn list_comment_likes(&mut self, article: ArticleId) -> anyhow::Result<Vec<CommentLike>> {
        Ok(self.likes_of(&article))
    }

    async fn toggle_comment_like(
        &mut self,
        actor: UserId,
        comment: CommentId,
    ) -> anyhow::Result<Result<LikeState, Error>> {
        Ok(self.toggle_like(actor, comment))
    }
}
