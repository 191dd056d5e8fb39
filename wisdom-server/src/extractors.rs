use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{self, request},
};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use wisdom_engine::api::{UserId, Uuid};
use wisdom_store::{Inbox, MemStore};

use crate::Error;

#[derive(Clone, Debug)]
pub struct Config {
    /// Number of notifications in the latest-notifications listing
    pub notification_page: usize,

    /// Number of articles in the top-articles listing
    pub top_articles: usize,

    /// Search limit when the request does not set one
    pub search_limit: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            notification_page: 20,
            top_articles: 5,
            search_limit: 100,
        }
    }
}

#[derive(Clone, axum::extract::FromRef)]
pub struct AppState {
    pub store: Store,
    pub inbox: SharedInbox,
    pub config: Config,
}

/// The store, shared between handlers.
///
/// Writers hold the lock for their whole check-then-write sequence, which is
/// what serializes concurrent like toggles.
#[derive(Clone)]
pub struct Store(Arc<RwLock<MemStore>>);

impl Store {
    pub fn new(store: MemStore) -> Store {
        Store(Arc::new(RwLock::new(store)))
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, MemStore> {
        self.0.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, MemStore> {
        self.0.write().await
    }
}

#[derive(Clone, Default)]
pub struct SharedInbox(Arc<RwLock<Inbox>>);

impl SharedInbox {
    pub fn new() -> SharedInbox {
        SharedInbox::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Inbox> {
        self.0.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Inbox> {
        self.0.write().await
    }
}

/// The calling user, as asserted by the identity provider in front of us
pub struct Auth(pub UserId);

#[async_trait]
impl<S: Sync> FromRequestParts<S> for Auth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, _state: &S) -> Result<Auth, Error> {
        match req.headers.get(http::header::AUTHORIZATION) {
            None => Err(Error::permission_denied()),
            Some(auth) => {
                let auth = auth.to_str().map_err(|_| Error::permission_denied())?;
                let mut auth = auth.split(' ');
                if !auth
                    .next()
                    .ok_or(Error::permission_denied())?
                    .eq_ignore_ascii_case("bearer")
                {
                    return Err(Error::permission_denied());
                }
                let user = auth.next().ok_or(Error::permission_denied())?;
                if auth.next().is_some() {
                    return Err(Error::permission_denied());
                }
                let user = Uuid::try_parse(user).map_err(|_| Error::permission_denied())?;
                Ok(Auth(UserId(user)))
            }
        }
    }
}
