use std::fmt::{self, Debug};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

pub mod jsonrpc;

use super::model::{GetAddressResult, GetInfoResult, OpenChannelResult, WalletBalance};
use super::{
    AccountChangeCallback, EventHandle, ProviderError, WalletProvider, CONNECT_PEER_TIMEOUT_SECS,
};

pub trait Client {
    type Error: Into<ProviderError> + Debug;
    fn request<S: Serialize + Debug, D: DeserializeOwned + Debug>(
        &self,
        method: &str,
        params: Option<S>,
    ) -> Result<D, Self::Error>;
}

/// A wallet provider reached through an RPC transport.
pub struct Gateway<C: Client> {
    client: C,
    listeners: Mutex<Vec<(EventHandle, AccountChangeCallback)>>,
}

impl<C: Client> Gateway<C> {
    pub fn new(client: C) -> Gateway<C> {
        Gateway {
            client,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Generic call function for RPC calls.
    fn call<T: Serialize + Debug, U: DeserializeOwned + Debug>(
        &self,
        method: &str,
        input: Option<T>,
    ) -> Result<U, ProviderError> {
        info!("{}", method);
        self.client.request(method, input).map_err(|e| {
            error!("method {} failed: {:?}", method, e);
            e.into()
        })
    }

    /// Entry point for the host: run the registered account-change
    /// callbacks. Cancelled registrations are dropped on the way.
    pub fn notify_account_changed(&self) {
        let mut listeners = self.listeners.lock().expect("poisoned");
        listeners.retain(|(handle, _)| handle.is_active());
        for (_, callback) in listeners.iter() {
            callback();
        }
    }
}

impl<C: Client + Debug> fmt::Debug for Gateway<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Gateway").field("client", &self.client).finish()
    }
}

#[async_trait]
impl<C: Client + Send + Sync + Debug> WalletProvider for Gateway<C> {
    async fn enable(&self) -> Result<(), ProviderError> {
        let _res: serde_json::value::Value = self.call("enable", Option::<Request>::None)?;
        Ok(())
    }

    async fn is_enabled(&self) -> Result<bool, ProviderError> {
        self.call("isenabled", Option::<Request>::None)
    }

    async fn get_info(&self) -> Result<GetInfoResult, ProviderError> {
        self.call("getinfo", Option::<Request>::None)
    }

    async fn wallet_balance(&self) -> Result<WalletBalance, ProviderError> {
        self.call("walletbalance", Option::<Request>::None)
    }

    async fn new_address(&self) -> Result<GetAddressResult, ProviderError> {
        self.call("newaddress", Option::<Request>::None)
    }

    async fn connect_peer(&self, pubkey: &str, host: &str) -> Result<(), ProviderError> {
        let _res: serde_json::value::Value = self.call(
            "connectpeer",
            Some(json!({
                "addr": {
                    "pubkey": pubkey,
                    "host": host,
                },
                "perm": true,
                "timeout": CONNECT_PEER_TIMEOUT_SECS,
            })),
        )?;
        Ok(())
    }

    async fn open_channel(&self, node_pubkey: &str) -> Result<OpenChannelResult, ProviderError> {
        self.call(
            "openchannel",
            Some(json!({
                "node_pubkey": node_pubkey,
                "fund_max": true,
            })),
        )
    }

    fn on_account_changed(
        &self,
        callback: AccountChangeCallback,
    ) -> Result<EventHandle, ProviderError> {
        let handle = EventHandle::new();
        self.listeners
            .lock()
            .expect("poisoned")
            .push((handle.clone(), callback));
        Ok(handle)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Request {}
