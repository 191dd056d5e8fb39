use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use wisdom_engine::api::{
    Article, ArticleId, ArticleSort, ArticleWithStats, CommentId, CommentNode, CommentStore,
    LikeState, LikeStore, NewArticle, NewComment, Notification, Page, PageRequest, User, UserId,
};

use crate::{extractors::*, Error};

pub async fn sync_user(
    Auth(user): Auth,
    State(store): State<Store>,
    Json(data): Json<User>,
) -> Result<(), Error> {
    if user != data.id {
        return Err(Error::permission_denied());
    }
    Ok(store.write().await.sync_user(data)?)
}

pub async fn update_user(
    Auth(user): Auth,
    State(store): State<Store>,
    Path(id): Path<UserId>,
    Json(data): Json<User>,
) -> Result<(), Error> {
    if user != id || id != data.id {
        return Err(Error::permission_denied());
    }
    Ok(store.write().await.update_user(data)?)
}

pub async fn fetch_user(State(store): State<Store>, Path(id): Path<UserId>) -> Json<Option<User>> {
    Json(store.read().await.user(&id).cloned())
}

pub async fn create_article(
    Auth(user): Auth,
    State(store): State<Store>,
    Json(data): Json<NewArticle>,
) -> Result<Json<ArticleId>, Error> {
    Ok(Json(store.write().await.create_article(user, data)?))
}

pub async fn fetch_article(
    State(store): State<Store>,
    Path(id): Path<ArticleId>,
) -> Result<Json<Article>, Error> {
    Ok(Json(
        store
            .read()
            .await
            .article(&id)
            .cloned()
            .ok_or(Error::article_not_found(id))?,
    ))
}

pub async fn delete_article(
    Auth(user): Auth,
    State(store): State<Store>,
    Path(id): Path<ArticleId>,
) -> Result<(), Error> {
    Ok(store.write().await.delete_article(user, id)?)
}

pub async fn top_articles(
    State(store): State<Store>,
    State(config): State<Config>,
) -> Json<Vec<Article>> {
    Json(store.read().await.article_dump().top(config.top_articles))
}

#[derive(Debug, serde::Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
    #[serde(default)]
    pub sort: ArticleSort,
}

pub async fn search_articles(
    State(store): State<Store>,
    State(config): State<Config>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<ArticleWithStats>> {
    let limit = params.limit.unwrap_or(config.search_limit);
    Json(
        store
            .read()
            .await
            .article_dump()
            .search(&params.query, params.sort, limit),
    )
}

pub async fn articles_by_author(
    State(store): State<Store>,
    Path(author): Path<UserId>,
) -> Json<Vec<ArticleWithStats>> {
    Json(store.read().await.article_dump().by_author(&author))
}

pub async fn liked_articles(
    State(store): State<Store>,
    Path(user): Path<UserId>,
) -> Json<Vec<ArticleWithStats>> {
    let store = store.read().await;
    Json(store.article_dump().among(&store.liked_articles(&user)))
}

pub async fn like_article(
    Auth(user): Auth,
    State(store): State<Store>,
    Path(id): Path<ArticleId>,
) -> Result<Json<bool>, Error> {
    Ok(Json(store.write().await.like_article(user, id)?))
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct ArticleLikes {
    pub count: usize,

    /// Always false for anonymous callers
    pub has_liked: bool,
}

pub async fn article_likes(
    user: Option<Auth>,
    State(store): State<Store>,
    Path(id): Path<ArticleId>,
) -> Json<ArticleLikes> {
    let store = store.read().await;
    Json(ArticleLikes {
        count: store.article_like_count(&id),
        has_liked: user
            .map(|Auth(u)| store.has_liked_article(u, id))
            .unwrap_or(false),
    })
}

pub async fn fetch_comments(
    State(store): State<Store>,
    Path(article): Path<ArticleId>,
) -> Result<Json<Vec<CommentNode>>, Error> {
    Ok(Json(store.read().await.thread(article)?.tree()))
}

pub async fn comment_feed(
    State(store): State<Store>,
    Path(article): Path<ArticleId>,
    Query(req): Query<PageRequest>,
) -> Result<Json<Page<CommentNode>>, Error> {
    Ok(Json(store.read().await.thread(article)?.feed(&req)))
}

pub async fn add_comment(
    Auth(user): Auth,
    State(store): State<Store>,
    Json(data): Json<NewComment>,
) -> Result<Json<CommentId>, Error> {
    let article = data.article_id;
    Ok(Json(
        store
            .write()
            .await
            .insert_comment(user, data)
            .await
            .with_context(|| format!("inserting comment on {article:?} for {user:?}"))??,
    ))
}

pub async fn delete_comment(
    Auth(user): Auth,
    State(store): State<Store>,
    Path(id): Path<CommentId>,
) -> Result<(), Error> {
    Ok(store
        .write()
        .await
        .delete_comment(user, id)
        .await
        .with_context(|| format!("deleting comment {id:?} for {user:?}"))??)
}

pub async fn toggle_comment_like(
    Auth(user): Auth,
    State(store): State<Store>,
    Path(id): Path<CommentId>,
) -> Result<Json<LikeState>, Error> {
    Ok(Json(
        store
            .write()
            .await
            .toggle_comment_like(user, id)
            .await
            .with_context(|| format!("toggling like on {id:?} for {user:?}"))??,
    ))
}

pub async fn latest_notifications(
    Auth(user): Auth,
    State(inbox): State<SharedInbox>,
    State(config): State<Config>,
) -> Json<Vec<Notification>> {
    Json(inbox.read().await.latest(&user, config.notification_page))
}

pub async fn all_notifications(
    Auth(user): Auth,
    State(inbox): State<SharedInbox>,
) -> Json<Vec<Notification>> {
    Json(inbox.read().await.all(&user))
}

pub async fn unread_notifications(
    Auth(user): Auth,
    State(inbox): State<SharedInbox>,
) -> Json<usize> {
    Json(inbox.read().await.unread_count(&user))
}

pub async fn mark_notifications_read(Auth(user): Auth, State(inbox): State<SharedInbox>) {
    inbox.write().await.mark_all_read(&user)
}
