//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use bums_runner::client::{ApiRequest, Endpoint, Payload, RemoteClient};
use bums_runner::models::ProxyBinding;
use bums_runner::pipeline::{AccountPipeline, PipelineSettings};
use bums_runner::tasks::EpisodeCodes;
use bums_runner::utils::error::RemoteError;

pub const TOKEN: &str = "token-abc";
pub const SECRET: &str = "test-secret";
pub const INVITATION: &str = "INVITE42";
pub const DEFAULT_GANG: &str = "night-owls";
pub const STEP_DELAY: Duration = Duration::from_secs(5);

/// One call seen by [`ScriptedClient`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: Endpoint,
    pub payload: Payload,
    pub token: Option<String>,
    pub proxy: Option<String>,
}

impl RecordedCall {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.payload.get(key)
    }
}

/// In-memory [`RemoteClient`] answering from per-endpoint scripts
///
/// Queued responses are consumed first; once a queue is empty the endpoint's
/// fallback answers. Endpoints with neither answer with an API error.
#[derive(Default)]
pub struct ScriptedClient {
    queued: Mutex<HashMap<Endpoint, VecDeque<Result<Value, RemoteError>>>>,
    fallback: Mutex<HashMap<Endpoint, Result<Value, RemoteError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    external_ip: Mutex<Option<Result<String, RemoteError>>>,
    ip_lookups: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue one response for `endpoint`
    pub fn push(&self, endpoint: Endpoint, response: Result<Value, RemoteError>) -> &Self {
        self.queued
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(response);
        self
    }

    /// Answer every unqueued call to `endpoint` with `response`
    pub fn always(&self, endpoint: Endpoint, response: Result<Value, RemoteError>) -> &Self {
        self.fallback.lock().unwrap().insert(endpoint, response);
        self
    }

    pub fn set_external_ip(&self, response: Result<String, RemoteError>) {
        *self.external_ip.lock().unwrap() = Some(response);
    }

    pub fn ip_lookups(&self) -> usize {
        self.ip_lookups.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.endpoint == endpoint)
            .collect()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.calls().into_iter().map(|c| c.endpoint).collect()
    }
}

#[async_trait]
impl RemoteClient for ScriptedClient {
    async fn call(
        &self,
        request: ApiRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<Value, RemoteError> {
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }

        self.calls.lock().unwrap().push(RecordedCall {
            endpoint: request.endpoint,
            payload: request.payload.clone(),
            token: request.auth_token.map(str::to_string),
            proxy: request.proxy.map(|p| p.uri().to_string()),
        });

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&request.endpoint)
            .and_then(|queue| queue.pop_front());

        queued
            .or_else(|| self.fallback.lock().unwrap().get(&request.endpoint).cloned())
            .unwrap_or_else(|| {
                Err(RemoteError::Api {
                    code: -1,
                    message: format!("unscripted call to {:?}", request.endpoint),
                })
            })
    }

    async fn resolve_external_ip(
        &self,
        _proxy: &ProxyBinding,
        _cancel: &CancellationToken,
    ) -> Result<String, RemoteError> {
        self.ip_lookups.fetch_add(1, Ordering::SeqCst);
        self.external_ip
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok("203.0.113.7".to_string()))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Telegram-style init data carrying a `user=` field
pub fn init_data(id: i64, first_name: &str) -> String {
    let user = json!({"id": id, "first_name": first_name, "language_code": "en"}).to_string();
    let encoded: String = url::form_urlencoded::byte_serialize(user.as_bytes()).collect();
    format!("query_id=AAH{id}&user={encoded}&auth_date=1700000000&hash=deadbeef")
}

pub fn settings(sweep_tasks: bool, plan_upgrades: bool) -> PipelineSettings {
    PipelineSettings {
        invitation_code: INVITATION.to_string(),
        secret_key: SECRET.to_string(),
        default_gang: DEFAULT_GANG.to_string(),
        step_delay: STEP_DELAY,
        sweep_tasks,
        plan_upgrades,
        max_upgrade_cost: 1_000_000,
    }
}

pub fn pipeline(client: &Arc<ScriptedClient>, settings: PipelineSettings) -> AccountPipeline {
    let client: Arc<dyn RemoteClient> = client.clone();
    AccountPipeline::new(client, settings, Arc::new(EpisodeCodes::builtin()))
}

pub fn game_info(coin: i64, energy: i64, seq_no: i64) -> Value {
    json!({
        "gameInfo": {"coin": coin.to_string(), "energySurplus": energy},
        "tapInfo": {"collectInfo": {"collectSeqNo": seq_no}}
    })
}

pub fn ok() -> Result<Value, RemoteError> {
    Ok(Value::Null)
}

/// Scripts login, an available sign-in day, no gang and the given game state
pub fn script_account(client: &ScriptedClient, coin: i64, energy: i64, seq_no: i64) {
    client
        .push(Endpoint::Login, Ok(json!({"token": TOKEN})))
        .push(
            Endpoint::SignLists,
            Ok(json!({"lists": [
                {"days": 1, "normal": 500, "status": 1},
                {"days": 2, "normal": 1000, "status": 0}
            ]})),
        )
        .push(Endpoint::Sign, ok())
        .push(Endpoint::GangLists, Ok(json!({"myGang": null})))
        .push(Endpoint::GangJoin, ok())
        .push(Endpoint::GameInfo, Ok(game_info(coin, energy, seq_no)));
}

/// Collection responses that hand out `first`, `first + 1`, ...
pub fn script_collections(client: &ScriptedClient, first: i64, count: usize) {
    for i in 0..count {
        client.push(
            Endpoint::CollectCoin,
            Ok(json!({"collectSeqNo": first + i as i64})),
        );
    }
}
