//! Remote API access
//!
//! The account pipeline talks to the game API only through the
//! [`RemoteClient`] capability: one uniform call that takes an endpoint, a
//! payload, an optional bearer token and an optional proxy, and yields the
//! `data` member of the response envelope or a [`RemoteError`].
//!
//! - [`http::BumsClient`] - reqwest implementation with per-proxy clients
//! - [`api::BumsApi`] - typed endpoint facade used by the pipeline
//! - [`headers`] - browser-like default headers

pub mod api;
pub mod headers;
pub mod http;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::models::ProxyBinding;
use crate::utils::error::RemoteError;

pub use api::BumsApi;
pub use http::{BumsClient, ClientConfig};

/// Remote operations the pipeline can sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    GameInfo,
    CollectCoin,
    TaskLists,
    FinishTask,
    MineLists,
    UpgradeMine,
    SignLists,
    Sign,
    GangLists,
    GangJoin,
}

impl Endpoint {
    /// Path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/miniapps/api/user/telegram_auth",
            Self::GameInfo => "/miniapps/api/user_game_level/getGameInfo",
            Self::CollectCoin => "/miniapps/api/user_game/collectCoin",
            Self::TaskLists => "/miniapps/api/task/lists",
            Self::FinishTask => "/miniapps/api/task/finish_task",
            Self::MineLists => "/miniapps/api/mine/getMineLists",
            Self::UpgradeMine => "/miniapps/api/mine/upgrade",
            Self::SignLists => "/miniapps/api/sign/getSignLists",
            Self::Sign => "/miniapps/api/sign/sign",
            Self::GangLists => "/miniapps/api/gang/gang_lists",
            Self::GangJoin => "/miniapps/api/gang/gang_join",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Self::GameInfo | Self::TaskLists | Self::SignLists => Method::GET,
            _ => Method::POST,
        }
    }
}

/// Request body or query encoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Payload {
    #[default]
    Empty,
    /// URL query parameters
    Query(Vec<(String, String)>),
    /// `application/x-www-form-urlencoded` body
    Form(Vec<(String, String)>),
    /// `multipart/form-data` body
    Multipart(Vec<(String, String)>),
}

impl Payload {
    /// Look up a field regardless of encoding
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Query(fields) | Self::Form(fields) | Self::Multipart(fields) => fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
        }
    }
}

/// Builds `Vec<(String, String)>` field lists from literal pairs
pub(crate) fn fields<const N: usize>(pairs: [(&str, String); N]) -> Vec<(String, String)> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// One remote call
#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    pub endpoint: Endpoint,
    pub payload: Payload,
    pub auth_token: Option<&'a str>,
    pub proxy: Option<&'a ProxyBinding>,
}

impl<'a> ApiRequest<'a> {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            payload: Payload::Empty,
            auth_token: None,
            proxy: None,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_auth(mut self, token: Option<&'a str>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn via(mut self, proxy: Option<&'a ProxyBinding>) -> Self {
        self.proxy = proxy;
        self
    }
}

/// Capability the pipeline uses to reach the remote API
///
/// A call suspends only the calling account's task. When `cancel` fires the
/// call must give up and return [`RemoteError::Cancelled`].
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Issue one call and return the envelope's `data` member
    async fn call(
        &self,
        request: ApiRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<Value, RemoteError>;

    /// Resolve the public IP seen through `proxy` (diagnostics only)
    async fn resolve_external_ip(
        &self,
        proxy: &ProxyBinding,
        cancel: &CancellationToken,
    ) -> Result<String, RemoteError>;
}
