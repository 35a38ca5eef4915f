//! Interface to the external wallet provider.
//!
//! The provider is a separate process owning the lightning node. We never
//! assume it is there: it is injected as an optional capability and its
//! absence is a normal state, not an error.

pub mod client;
pub mod model;

use std::fmt::{self, Debug};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use model::{GetAddressResult, GetInfoResult, OpenChannelResult, WalletBalance};

/// Remote methods the onboarding flow cannot run without, as reported in
/// the provider's `getinfo` method list.
pub const REQUIRED_METHODS: [&str; 2] = ["request.walletbalance", "request.newaddress"];

/// Timeout hint passed along with `connectpeer`, enforced by the provider.
pub const CONNECT_PEER_TIMEOUT_SECS: u64 = 10;

#[derive(Debug)]
pub enum ProviderError {
    /// No wallet provider is reachable.
    Unavailable,
    /// The provider processed the request and refused it.
    Rpc(i32, String),
    /// Something was wrong with the rpc socket communication.
    Transport(Option<ErrorKind>, String),
    /// Something unexpected happened.
    Unexpected(String),
    /// No response.
    NoAnswer,
    /// Not supported by this provider.
    NotSupported,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "Wallet provider is not available"),
            Self::Rpc(code, e) => write!(f, "Provider error rpc call: [{:?}] {}", code, e),
            Self::Transport(kind, e) => write!(f, "Provider transport error: [{:?}] {}", kind, e),
            Self::Unexpected(e) => write!(f, "Provider unexpected error: {}", e),
            Self::NoAnswer => write!(f, "Provider returned no answer"),
            Self::NotSupported => write!(f, "Not supported by this provider"),
        }
    }
}

pub type AccountChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Handle over a registered notification callback. The callback keeps
/// firing until the handle is cancelled.
#[derive(Debug, Clone)]
pub struct EventHandle {
    active: Arc<AtomicBool>,
}

impl EventHandle {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn cancel(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

impl Default for EventHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait WalletProvider: Debug + Send + Sync {
    /// Ask the user to authorize this application. Fails if the provider
    /// refuses. Callers check for provider existence beforehand.
    async fn enable(&self) -> Result<(), ProviderError>;

    /// Whether a previous authorization is in place, without prompting.
    async fn is_enabled(&self) -> Result<bool, ProviderError>;

    /// Supported remote methods and node metadata.
    async fn get_info(&self) -> Result<GetInfoResult, ProviderError>;

    /// On-chain balance of the node's wallet.
    async fn wallet_balance(&self) -> Result<WalletBalance, ProviderError>;

    /// Derive a fresh on-chain deposit address.
    async fn new_address(&self) -> Result<GetAddressResult, ProviderError>;

    /// Ask the node to establish (and keep) a connection to this peer.
    async fn connect_peer(&self, pubkey: &str, host: &str) -> Result<(), ProviderError>;

    /// Open a channel to the node identified by `node_pubkey` (base64 of
    /// the raw key bytes), committing the whole spendable on-chain balance.
    async fn open_channel(&self, node_pubkey: &str) -> Result<OpenChannelResult, ProviderError>;

    /// Register `callback` to run whenever the active account changes in
    /// the provider. No ordering guarantee beyond firing after the switch
    /// happened.
    fn on_account_changed(
        &self,
        callback: AccountChangeCallback,
    ) -> Result<EventHandle, ProviderError>;
}
