//! Typed facade over [`RemoteClient`]
//!
//! Binds a client to one account's proxy and cancellation token and turns
//! each endpoint's `data` payload into model types.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::{fields, ApiRequest, Endpoint, Payload, RemoteClient};
use crate::models::{
    lenient_i64, GameInfo, GangMembership, ProxyBinding, SignDay, TaskItem, UpgradeOption,
};
use crate::utils::error::RemoteError;
use crate::utils::timestamp_millis;

/// Gang list filter parameters the app sends
const GANG_BOOST_NUM: &str = "15";
const GANG_POWER_NUM: &str = "35";

/// Endpoint calls for a single account
#[derive(Clone, Copy)]
pub struct BumsApi<'a> {
    client: &'a dyn RemoteClient,
    proxy: Option<&'a ProxyBinding>,
    cancel: &'a CancellationToken,
}

impl<'a> BumsApi<'a> {
    pub fn new(
        client: &'a dyn RemoteClient,
        proxy: Option<&'a ProxyBinding>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            client,
            proxy,
            cancel,
        }
    }

    pub fn proxy(&self) -> Option<&'a ProxyBinding> {
        self.proxy
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        payload: Payload,
        token: Option<&str>,
    ) -> Result<Value, RemoteError> {
        let request = ApiRequest::new(endpoint)
            .with_payload(payload)
            .with_auth(token)
            .via(self.proxy);

        self.client.call(request, self.cancel).await
    }

    /// Resolve the external IP of this account's proxy
    pub async fn external_ip(&self) -> Option<Result<String, RemoteError>> {
        match self.proxy {
            Some(proxy) => Some(self.client.resolve_external_ip(proxy, self.cancel).await),
            None => None,
        }
    }

    /// Log in and return the bearer token
    pub async fn login(&self, init_data: &str, invitation_code: &str) -> Result<String, RemoteError> {
        let payload = Payload::Multipart(fields([
            ("invitationCode", invitation_code.to_string()),
            ("initData", init_data.to_string()),
        ]));
        let data = self.send(Endpoint::Login, payload, None).await?;

        data.get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Decode("login response without token".to_string()))
    }

    /// Balance, energy and current collection sequence number
    pub async fn game_info(&self, token: &str) -> Result<GameInfo, RemoteError> {
        let data = self.send(Endpoint::GameInfo, Payload::Empty, Some(token)).await?;

        let energy_surplus = pointer_i64(&data, "/gameInfo/energySurplus")?;
        // only needed when there is energy to submit
        let collect_seq_no = if energy_surplus > 0 {
            pointer_i64(&data, "/tapInfo/collectInfo/collectSeqNo")?
        } else {
            0
        };

        Ok(GameInfo {
            coin: pointer_i64(&data, "/gameInfo/coin")?,
            energy_surplus,
            collect_seq_no,
        })
    }

    /// Submit one energy chunk; returns the server's next sequence number
    pub async fn collect_coin(
        &self,
        token: &str,
        amount: u64,
        seq_no: i64,
        hash_code: &str,
    ) -> Result<i64, RemoteError> {
        let payload = Payload::Multipart(fields([
            ("hashCode", hash_code.to_string()),
            ("collectSeqNo", seq_no.to_string()),
            ("collectAmount", amount.to_string()),
        ]));
        let data = self.send(Endpoint::CollectCoin, payload, Some(token)).await?;

        pointer_i64(&data, "/collectSeqNo")
    }

    /// Tasks not yet finished
    pub async fn unfinished_tasks(&self, token: &str) -> Result<Vec<TaskItem>, RemoteError> {
        let payload = Payload::Query(fields([("_t", timestamp_millis().to_string())]));
        let data = self.send(Endpoint::TaskLists, payload, Some(token)).await?;

        let tasks: Vec<TaskItem> = take_list(data, "lists")?;
        Ok(tasks.into_iter().filter(|t| !t.finished).collect())
    }

    /// Complete a task, with the hidden-code answer when one applies
    pub async fn finish_task(
        &self,
        token: &str,
        task_id: i64,
        secret_code: Option<&str>,
    ) -> Result<(), RemoteError> {
        let mut params = fields([("id", task_id.to_string())]);
        if let Some(code) = secret_code {
            params.push(("pwd".to_string(), code.to_string()));
        }
        params.push(("_t".to_string(), timestamp_millis().to_string()));

        self.send(Endpoint::FinishTask, Payload::Form(params), Some(token))
            .await
            .map(drop)
    }

    /// Upgrade catalog
    pub async fn mine_list(&self, token: &str) -> Result<Vec<UpgradeOption>, RemoteError> {
        let data = self.send(Endpoint::MineLists, Payload::Empty, Some(token)).await?;
        take_list(data, "lists")
    }

    pub async fn upgrade_mine(&self, token: &str, mine_id: i64) -> Result<(), RemoteError> {
        let payload = Payload::Multipart(fields([("mineId", mine_id.to_string())]));
        self.send(Endpoint::UpgradeMine, payload, Some(token))
            .await
            .map(drop)
    }

    /// Sign-in calendar
    pub async fn sign_list(&self, token: &str) -> Result<Vec<SignDay>, RemoteError> {
        let data = self.send(Endpoint::SignLists, Payload::Empty, Some(token)).await?;
        take_list(data, "lists")
    }

    pub async fn sign(&self, token: &str) -> Result<(), RemoteError> {
        self.send(Endpoint::Sign, Payload::Multipart(Vec::new()), Some(token))
            .await
            .map(drop)
    }

    /// Current gang affiliation
    pub async fn gang_membership(&self, token: &str) -> Result<GangMembership, RemoteError> {
        let payload = Payload::Multipart(fields([
            ("boostNum", GANG_BOOST_NUM.to_string()),
            ("powerNum", GANG_POWER_NUM.to_string()),
        ]));
        let mut data = self.send(Endpoint::GangLists, payload, Some(token)).await?;

        match data.get_mut("myGang").map(Value::take) {
            None | Some(Value::Null) => Ok(GangMembership::default()),
            Some(gang) => {
                serde_json::from_value(gang).map_err(|e| RemoteError::Decode(e.to_string()))
            }
        }
    }

    pub async fn join_gang(&self, token: &str, name: &str) -> Result<(), RemoteError> {
        let payload = Payload::Multipart(fields([("name", name.to_string())]));
        self.send(Endpoint::GangJoin, payload, Some(token))
            .await
            .map(drop)
    }
}

fn pointer_i64(data: &Value, pointer: &str) -> Result<i64, RemoteError> {
    data.pointer(pointer)
        .filter(|v| !v.is_null())
        .and_then(lenient_i64)
        .ok_or_else(|| RemoteError::Decode(format!("missing or non-numeric field {pointer}")))
}

fn take_list<T: DeserializeOwned>(mut data: Value, key: &str) -> Result<Vec<T>, RemoteError> {
    match data.get_mut(key).map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(list) => serde_json::from_value(list).map_err(|e| RemoteError::Decode(e.to_string())),
    }
}
