use anyhow::Context;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use wisdom_store::MemStore;

mod error;
mod extractors;
mod feeds;
mod fuzz;
mod handlers;

use error::Error;
use extractors::*;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Address to listen on
    #[structopt(short, long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Number of notifications returned by the latest-notifications listing
    #[structopt(long, default_value = "20")]
    notification_page: usize,

    /// Number of articles returned by the top-articles listing
    #[structopt(long, default_value = "5")]
    top_articles: usize,

    /// Maximum number of search results when the request does not set one
    #[structopt(long, default_value = "100")]
    search_limit: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let config = Config {
        notification_page: opt.notification_page,
        top_articles: opt.top_articles,
        search_limit: opt.search_limit,
    };

    let app = app(config).await;

    tracing::info!("listening on {}", opt.listen);
    axum::Server::bind(&opt.listen)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}

pub async fn app(config: Config) -> Router {
    let mut store = MemStore::new();
    let inbox = SharedInbox::new();
    feeds::spawn_relay(store.notification_feed(), inbox.clone());
    let state = AppState {
        store: Store::new(store),
        inbox,
        config,
    };

    Router::new()
        .route("/api/users", put(handlers::sync_user))
        .route(
            "/api/users/:id",
            get(handlers::fetch_user).post(handlers::update_user),
        )
        .route("/api/users/:id/articles", get(handlers::articles_by_author))
        .route("/api/users/:id/liked", get(handlers::liked_articles))
        .route("/api/articles", post(handlers::create_article))
        .route("/api/articles/top", get(handlers::top_articles))
        .route("/api/articles/search", get(handlers::search_articles))
        .route(
            "/api/articles/:id",
            get(handlers::fetch_article).delete(handlers::delete_article),
        )
        .route(
            "/api/articles/:id/likes",
            get(handlers::article_likes).post(handlers::like_article),
        )
        .route("/api/articles/:id/comments", get(handlers::fetch_comments))
        .route("/api/articles/:id/feed", get(handlers::comment_feed))
        .route("/api/comments", post(handlers::add_comment))
        .route("/api/comments/:id", delete(handlers::delete_comment))
        .route(
            "/api/comments/:id/like",
            post(handlers::toggle_comment_like),
        )
        .route("/api/notifications", get(handlers::latest_notifications))
        .route("/api/notifications/all", get(handlers::all_notifications))
        .route(
            "/api/notifications/unread",
            get(handlers::unread_notifications),
        )
        .route(
            "/api/notifications/read",
            post(handlers::mark_notifications_read),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
