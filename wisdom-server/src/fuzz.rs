#![cfg(test)]

use axum::{
    extract::FromRequestParts,
    http::{self, request},
    Router,
};
use bolero::generator::TypeGenerator;
use std::{collections::HashSet, fmt::Debug, panic::AssertUnwindSafe};
use tower::{Service, ServiceExt};
use wisdom_engine::api::{
    Article, ArticleId, ArticleWithStats, CommentId, CommentNode, Error as ApiError, FeedMode,
    LikeState, NewArticle, NewComment, Notification, NotificationKind, Page, User, UserId, Uuid,
};

use crate::{extractors::*, handlers::ArticleLikes, *};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

do_tokio_test!(fuzz_auth_extractor, String, |token| async move {
    if let Ok(req) = http::Request::builder()
        .method(http::Method::GET)
        .uri("/")
        .header(http::header::AUTHORIZATION, token)
        .body(())
    {
        let mut req = req.into_parts().0;
        let res = Auth::from_request_parts(&mut req, &()).await;
        match res {
            Ok(_) => (),
            Err(Error::Api(ApiError::PermissionDenied)) => (),
            Err(e) => panic!("got unexpected error: {e}"),
        }
    }
});

async fn call<Req, Resp>(
    app: &mut Router,
    req: request::Request<axum::body::Body>,
    req_body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    app.ready().await.expect("waiting for app to be ready");
    let resp = app.call(req).await.expect("running request");
    let status = resp.status();
    let body = hyper::body::to_bytes(resp.into_body())
        .await
        .expect("recovering resp bytes");
    if status == http::StatusCode::OK {
        if std::any::TypeId::of::<Resp>() == std::any::TypeId::of::<()>() {
            // the server returns an empty body in this situation, which serde_json rejects
            return Ok(serde_json::from_slice(b"null").unwrap());
        }
        return Ok(serde_json::from_slice(&body).unwrap_or_else(|err| {
            panic!(
                r#"
                    Failed parsing resp body!

                    The error is the following:
                    ---
                    {err}
                    ---

                    Response body is:
                    ---
                    {body:?}
                    ---

                    Request was:
                    ---
                    {req_body:?}
                    ---
                "#
            )
        }));
    }
    Err(ApiError::parse(&body)
        .unwrap_or_else(|err| panic!("parsing error response body {err}, body is {body:?}")))
}

async fn run_on_app<Req, Resp>(
    app: &mut Router,
    method: &str,
    uri: &str,
    token: Option<UserId>,
    body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug + serde::Serialize,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    let req = request::Builder::new()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    let req = match token {
        Some(UserId(token)) => req.header(http::header::AUTHORIZATION, format!("bearer {token}")),
        None => req,
    };
    let req = req
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serializing request body to json"),
        ))
        .expect("building request");
    call(app, req, body).await
}

async fn get<Resp>(app: &mut Router, uri: &str, token: Option<UserId>) -> Result<Resp, ApiError>
where
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    run_on_app(app, "GET", uri, token, &()).await
}

async fn new_user(app: &mut Router, name: &str) -> UserId {
    let id = UserId(Uuid::new_v4());
    let user = User {
        id,
        name: String::from(name),
        email: format!("{name}@example.org"),
        image_url: None,
    };
    let () = run_on_app(app, "PUT", "/api/users", Some(id), &user)
        .await
        .expect("syncing user");
    id
}

async fn new_article(app: &mut Router, author: UserId, title: &str, content: &str) -> ArticleId {
    let article = NewArticle {
        title: String::from(title),
        content: String::from(content),
        tags: Vec::new(),
    };
    run_on_app(app, "POST", "/api/articles", Some(author), &article)
        .await
        .expect("creating article")
}

async fn new_comment(
    app: &mut Router,
    author: UserId,
    article_id: ArticleId,
    parent_id: Option<CommentId>,
) -> Result<CommentId, ApiError> {
    let comment = NewComment {
        article_id,
        content: String::from("Well said."),
        parent_id,
    };
    run_on_app(app, "POST", "/api/comments", Some(author), &comment).await
}

async fn toggle(app: &mut Router, user: UserId, comment: CommentId) -> LikeState {
    run_on_app(
        app,
        "POST",
        &format!("/api/comments/{}/like", comment.0),
        Some(user),
        &(),
    )
    .await
    .expect("toggling like")
}

async fn like_article(app: &mut Router, user: UserId, article: ArticleId) -> bool {
    let uri = format!("/api/articles/{}/likes", article.0);
    run_on_app(app, "POST", &uri, Some(user), &())
        .await
        .expect("liking article")
}

async fn tree_of(app: &mut Router, article: ArticleId) -> Vec<CommentNode> {
    get(app, &format!("/api/articles/{}/comments", article.0), None)
        .await
        .expect("fetching comment tree")
}

fn article_ids(articles: &[ArticleWithStats]) -> Vec<ArticleId> {
    articles.iter().map(|a| a.article.id).collect()
}

/// Fetches all pages of the feed, checking no page is over `limit`
async fn walk_feed(
    app: &mut Router,
    article: ArticleId,
    mode: &str,
    limit: usize,
) -> Vec<CommentNode> {
    let mut res = Vec::new();
    let mut cursor = None;
    loop {
        let uri = match cursor {
            None => format!("/api/articles/{}/feed?mode={mode}&limit={limit}", article.0),
            Some(CommentId(c)) => format!(
                "/api/articles/{}/feed?mode={mode}&limit={limit}&cursor={c}",
                article.0
            ),
        };
        let page: Page<CommentNode> = get(app, &uri, None).await.expect("fetching feed page");
        assert!(page.items.len() <= limit);
        res.extend(page.items);
        match page.next_cursor {
            None => return res,
            Some(c) => cursor = Some(c),
        }
    }
}

/// Notifications are delivered by a background task, give it some time
async fn wait_unread(app: &mut Router, user: UserId, expected: usize) -> usize {
    let since = std::time::Instant::now();
    loop {
        let unread: usize = get(app, "/api/notifications/unread", Some(user))
            .await
            .expect("counting unread notifications");
        if unread >= expected || since.elapsed() > std::time::Duration::from_secs(1) {
            return unread;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn anonymous_writes_are_refused() {
    let mut app = app(Config::default()).await;
    let article = NewArticle {
        title: String::from("Untitled"),
        content: String::from("Nothing."),
        tags: Vec::new(),
    };
    let res: Result<ArticleId, _> =
        run_on_app(&mut app, "POST", "/api/articles", None, &article).await;
    assert_eq!(res, Err(ApiError::PermissionDenied));

    let alice = new_user(&mut app, "alice").await;
    let bob = UserId(Uuid::new_v4());
    let alice_profile = User {
        id: alice,
        name: String::from("mallory"),
        email: String::from("mallory@example.org"),
        image_url: None,
    };
    let res: Result<(), _> = run_on_app(
        &mut app,
        "POST",
        &format!("/api/users/{}", alice.0),
        Some(bob),
        &alice_profile,
    )
    .await;
    assert_eq!(res, Err(ApiError::PermissionDenied));

    // the profile in the body must be the one named by the path
    let bob = new_user(&mut app, "bob").await;
    let res: Result<(), _> = run_on_app(
        &mut app,
        "POST",
        &format!("/api/users/{}", bob.0),
        Some(alice),
        &alice_profile,
    )
    .await;
    assert_eq!(res, Err(ApiError::PermissionDenied));
    let res: Result<(), _> = run_on_app(
        &mut app,
        "POST",
        &format!("/api/users/{}", alice.0),
        Some(bob),
        &alice_profile,
    )
    .await;
    assert_eq!(res, Err(ApiError::PermissionDenied));
    let user: Option<User> = get(&mut app, &format!("/api/users/{}", alice.0), None)
        .await
        .unwrap();
    assert_eq!(user.unwrap().name, "alice");

    let renamed = User {
        name: String::from("alicia"),
        ..alice_profile
    };
    let () = run_on_app(
        &mut app,
        "POST",
        &format!("/api/users/{}", alice.0),
        Some(alice),
        &renamed,
    )
    .await
    .unwrap();
    let user: Option<User> = get(&mut app, &format!("/api/users/{}", alice.0), None)
        .await
        .unwrap();
    assert_eq!(user.unwrap().name, "alicia");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_are_serialized() {
    const TOGGLES: usize = 25;
    let mut app = app(Config::default()).await;
    let alice = new_user(&mut app, "alice").await;
    let bob = new_user(&mut app, "bob").await;
    let article = new_article(&mut app, alice, "On haste", "Slow down.").await;
    let c1 = new_comment(&mut app, alice, article, None).await.unwrap();

    let tasks = (0..TOGGLES)
        .map(|_| {
            let mut app = app.clone();
            tokio::spawn(async move { toggle(&mut app, bob, c1).await })
        })
        .collect::<Vec<_>>();
    let mut liked = 0;
    for t in tasks {
        if t.await.expect("toggle task panicked") == LikeState::Liked {
            liked += 1;
        }
    }
    assert_eq!(liked, (TOGGLES + 1) / 2);

    let tree = tree_of(&mut app, article).await;
    assert_eq!(tree[0].like_count, TOGGLES % 2);
}

#[tokio::test]
async fn threads_and_feeds_over_http() {
    let mut app = app(Config::default()).await;
    let alice = new_user(&mut app, "alice").await;
    let bob = new_user(&mut app, "bob").await;
    let carol = new_user(&mut app, "carol").await;
    let article = new_article(&mut app, alice, "On silence", "Speak less.").await;

    let c1 = new_comment(&mut app, bob, article, None).await.unwrap();
    let c2 = new_comment(&mut app, carol, article, None).await.unwrap();
    let c3 = new_comment(&mut app, alice, article, Some(c1)).await.unwrap();
    assert_eq!(toggle(&mut app, alice, c2).await, LikeState::Liked);
    assert_eq!(toggle(&mut app, bob, c2).await, LikeState::Liked);
    assert_eq!(toggle(&mut app, carol, c3).await, LikeState::Liked);

    let tree = tree_of(&mut app, article).await;
    let n1 = CommentNode::find_in(&tree, &c1).expect("c1 is a root");
    assert_eq!(n1.children.len(), 1);
    assert_eq!(n1.children[0].id(), c3);
    assert_eq!(n1.children[0].depth, 1);
    assert_eq!(n1.children[0].like_count, 1);

    let liked = walk_feed(&mut app, article, "liked", 1).await;
    assert_eq!(liked.iter().map(|n| n.id()).collect::<Vec<_>>(), vec![c2, c1]);
    assert_eq!(liked[0].like_count, 2);

    let recent = walk_feed(&mut app, article, "recent", 10).await;
    assert_eq!(recent.iter().map(|n| n.id()).collect::<Vec<_>>(), vec![c2, c1]);

    // replying to a comment of another article
    let other = new_article(&mut app, bob, "On noise", "Speak more.").await;
    assert_eq!(
        new_comment(&mut app, bob, other, Some(c1)).await,
        Err(ApiError::ParentNotFound(c1))
    );
    let missing = ArticleId(Uuid::new_v4());
    assert_eq!(
        new_comment(&mut app, bob, missing, None).await,
        Err(ApiError::ArticleNotFound(missing))
    );
    let res: Result<Page<CommentNode>, _> =
        get(&mut app, &format!("/api/articles/{}/feed?limit=3", missing.0), None).await;
    assert_eq!(res, Err(ApiError::ArticleNotFound(missing)));

    // deleting a comment takes its replies along
    let res: Result<(), _> = run_on_app(
        &mut app,
        "DELETE",
        &format!("/api/comments/{}", c1.0),
        Some(carol),
        &(),
    )
    .await;
    assert_eq!(res, Err(ApiError::PermissionDenied));
    let () = run_on_app(
        &mut app,
        "DELETE",
        &format!("/api/comments/{}", c1.0),
        Some(bob),
        &(),
    )
    .await
    .unwrap();
    let tree = tree_of(&mut app, article).await;
    assert_eq!(tree.iter().map(|n| n.id()).collect::<Vec<_>>(), vec![c2]);
    let res: Result<LikeState, _> = run_on_app(
        &mut app,
        "POST",
        &format!("/api/comments/{}/like", c3.0),
        Some(bob),
        &(),
    )
    .await;
    assert_eq!(res, Err(ApiError::CommentNotFound(c3)));
}

#[tokio::test]
async fn articles_over_http() {
    let mut app = app(Config::default()).await;
    let alice = new_user(&mut app, "alice").await;
    let bob = new_user(&mut app, "bob").await;
    let a1 = new_article(&mut app, alice, "Patience", "Water wears down STONE.").await;
    let a2 = new_article(&mut app, bob, "Stoicism", "Control what you can.").await;

    assert!(like_article(&mut app, bob, a1).await);
    assert!(!like_article(&mut app, bob, a1).await);
    let likes: ArticleLikes = get(&mut app, &format!("/api/articles/{}/likes", a1.0), Some(bob))
        .await
        .unwrap();
    assert_eq!((likes.count, likes.has_liked), (1, true));
    let likes: ArticleLikes = get(&mut app, &format!("/api/articles/{}/likes", a1.0), None)
        .await
        .unwrap();
    assert_eq!((likes.count, likes.has_liked), (1, false));

    let found: Vec<ArticleWithStats> = get(&mut app, "/api/articles/search?query=stone", None)
        .await
        .unwrap();
    assert_eq!(article_ids(&found), vec![a1]);
    let found: Vec<ArticleWithStats> = get(&mut app, "/api/articles/search?sort=liked", None)
        .await
        .unwrap();
    assert_eq!(article_ids(&found), vec![a1, a2]);
    let found: Vec<ArticleWithStats> = get(&mut app, "/api/articles/search?limit=1", None)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    let top: Vec<Article> = get(&mut app, "/api/articles/top", None).await.unwrap();
    assert_eq!(top.len(), 2);
    let by_bob: Vec<ArticleWithStats> =
        get(&mut app, &format!("/api/users/{}/articles", bob.0), None)
            .await
            .unwrap();
    assert_eq!(article_ids(&by_bob), vec![a2]);
    let bob_likes: Vec<ArticleWithStats> =
        get(&mut app, &format!("/api/users/{}/liked", bob.0), None)
            .await
            .unwrap();
    assert_eq!(article_ids(&bob_likes), vec![a1]);

    let uri = format!("/api/articles/{}", a1.0);
    let res: Result<(), _> = run_on_app(&mut app, "DELETE", &uri, Some(bob), &()).await;
    assert_eq!(res, Err(ApiError::PermissionDenied));
    let () = run_on_app(&mut app, "DELETE", &uri, Some(alice), &())
        .await
        .unwrap();
    let res: Result<Article, _> = get(&mut app, &format!("/api/articles/{}", a1.0), None).await;
    assert_eq!(res, Err(ApiError::ArticleNotFound(a1)));
    let bob_likes: Vec<ArticleWithStats> =
        get(&mut app, &format!("/api/users/{}/liked", bob.0), None)
            .await
            .unwrap();
    assert!(bob_likes.is_empty());
}

#[tokio::test]
async fn notifications_reach_the_inbox() {
    let mut app = app(Config::default()).await;
    let alice = new_user(&mut app, "alice").await;
    let bob = new_user(&mut app, "bob").await;
    let article = new_article(&mut app, alice, "On trust", "Verify.").await;

    let c1 = new_comment(&mut app, bob, article, None).await.unwrap();
    new_comment(&mut app, alice, article, Some(c1)).await.unwrap();
    toggle(&mut app, alice, c1).await;
    toggle(&mut app, alice, c1).await; // unliking is silent
    like_article(&mut app, alice, article).await;

    assert_eq!(wait_unread(&mut app, alice, 1).await, 1);
    assert_eq!(wait_unread(&mut app, bob, 2).await, 2);

    let latest: Vec<Notification> = get(&mut app, "/api/notifications", Some(bob)).await.unwrap();
    assert_eq!(
        latest.iter().map(|n| (n.kind, n.sender_name.as_str())).collect::<Vec<_>>(),
        vec![
            (NotificationKind::CommentLike, "alice"),
            (NotificationKind::Reply, "alice"),
        ]
    );
    let latest: Vec<Notification> = get(&mut app, "/api/notifications/all", Some(alice))
        .await
        .unwrap();
    assert_eq!(latest[0].kind, NotificationKind::Comment);
    assert_eq!(latest[0].comment_id, Some(c1));

    let () = run_on_app(&mut app, "POST", "/api/notifications/read", Some(bob), &())
        .await
        .unwrap();
    assert_eq!(wait_unread(&mut app, bob, 0).await, 0);
    assert_eq!(wait_unread(&mut app, alice, 1).await, 1);
}

#[derive(Clone, Debug, TypeGenerator)]
enum FuzzOp {
    Comment { author: u8, parent: Option<u8> },
    Like { user: u8, comment: u8 },
    Delete { comment: u8 },
}

do_tokio_test!(
    fuzz_feed_pages_partition_the_roots,
    (Vec<FuzzOp>, u8),
    |(ops, limit): (Vec<FuzzOp>, u8)| async move {
        let mut app = app(Config::default()).await;
        let users = [
            new_user(&mut app, "alice").await,
            new_user(&mut app, "bob").await,
            new_user(&mut app, "carol").await,
        ];
        let article = new_article(&mut app, users[0], "Fuzzing", "Anything goes.").await;
        let mut comments: Vec<(CommentId, UserId)> = Vec::new();
        let pick = |comments: &Vec<(CommentId, UserId)>, i: u8| {
            (!comments.is_empty()).then(|| comments[i as usize % comments.len()])
        };
        for op in ops.into_iter().take(30) {
            match op {
                FuzzOp::Comment { author, parent } => {
                    let author = users[author as usize % users.len()];
                    let parent = parent.and_then(|p| pick(&comments, p)).map(|(c, _)| c);
                    // the parent may have been deleted already
                    if let Ok(id) = new_comment(&mut app, author, article, parent).await {
                        comments.push((id, author));
                    }
                }
                FuzzOp::Like { user, comment } => {
                    if let Some((c, _)) = pick(&comments, comment) {
                        let user = users[user as usize % users.len()];
                        let _: Result<LikeState, _> = run_on_app(
                            &mut app,
                            "POST",
                            &format!("/api/comments/{}/like", c.0),
                            Some(user),
                            &(),
                        )
                        .await;
                    }
                }
                FuzzOp::Delete { comment } => {
                    if let Some((c, author)) = pick(&comments, comment) {
                        let _: Result<(), _> = run_on_app(
                            &mut app,
                            "DELETE",
                            &format!("/api/comments/{}", c.0),
                            Some(author),
                            &(),
                        )
                        .await;
                    }
                }
            }
        }

        let tree = tree_of(&mut app, article).await;
        let roots = tree.iter().map(|n| n.id()).collect::<HashSet<_>>();
        let limit = 1 + limit as usize % 5;
        for (mode, name) in [(FeedMode::Recent, "recent"), (FeedMode::Liked, "liked")] {
            let pages = walk_feed(&mut app, article, name, limit).await;
            let ids = pages.iter().map(|n| n.id()).collect::<Vec<_>>();
            assert_eq!(
                ids.iter().copied().collect::<HashSet<_>>(),
                roots,
                "{mode:?} feed does not cover the roots exactly"
            );
            assert_eq!(ids.len(), roots.len(), "{mode:?} feed repeats a comment");
            assert!(pages.iter().all(|n| n.depth == 0));
            if mode == FeedMode::Liked {
                assert!(pages.windows(2).all(|w| w[0].like_count >= w[1].like_count));
            } else {
                assert!(pages.windows(2).all(|w| w[0].comment.date >= w[1].comment.date));
            }
        }
    }
);
