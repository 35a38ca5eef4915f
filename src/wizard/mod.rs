//! The onboarding sequence.
//!
//! A linear, three-stage flow: detect a usable wallet provider, get the
//! node funded on-chain, then connect to a peer and open a channel. Each
//! step's result gates the next, there are never two outstanding requests.
//! The flow performs no polling: re-running [`Wizard::initialize`] is the
//! one way to pick up external changes (a deposit confirming, an account
//! switch in the provider).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    codec::{self, CodecError},
    provider::{
        model::WalletBalance, EventHandle, ProviderError, WalletProvider, REQUIRED_METHODS,
    },
    store::{Store, StoreError, DEPOSIT_ADDRESS_KEY},
    targets::{self, FundingTarget, FUNDING_TARGETS},
};

#[derive(Debug)]
pub enum Error {
    Provider(ProviderError),
    Store(StoreError),
    Codec(CodecError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Provider(e) => write!(f, "{}", e),
            Self::Store(e) => write!(f, "{}", e),
            Self::Codec(e) => write!(f, "{}", e),
        }
    }
}

impl From<ProviderError> for Error {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

/// Titles of the three stages of the progress indicator.
pub const STAGES: [&str; 3] = ["Connect node", "Fund node", "Open channel"];

#[derive(Debug, Clone)]
pub enum OnboardingState {
    /// No usable wallet provider was found yet. Terminal until the flow is
    /// restarted with one.
    AwaitingWallet,
    /// A provider is there but its node does not accept the remote methods
    /// we need. Terminal, but an account switch re-arms the flow.
    CapabilityMissing,
    /// The node's confirmed balance affords none of the funding targets.
    /// Waiting for an on-chain deposit to `address`.
    AwaitingFunds {
        balance: WalletBalance,
        address: String,
    },
    /// At least one funding target is affordable. Waiting for the user to
    /// pick a peer and trigger the channel open.
    ReadyToConnect {
        balance: WalletBalance,
        eligible: Vec<&'static FundingTarget>,
        /// Last channel-open failure, kept for the display layer. The user
        /// may edit the form and retry.
        error: Option<String>,
    },
    /// The funding transaction is broadcast. Terminal.
    ChannelOpening { funding_txid: String },
    /// Initialization failed. Terminal, no automatic retry.
    Failed(String),
}

impl OnboardingState {
    /// Position on the three-stage progress indicator.
    pub fn stage_index(&self) -> usize {
        match self {
            Self::AwaitingWallet | Self::CapabilityMissing | Self::Failed(..) => 0,
            Self::AwaitingFunds { .. } => 1,
            Self::ReadyToConnect { .. } | Self::ChannelOpening { .. } => 2,
        }
    }
}

/// The connect-form values: either copied from a recommended target or
/// typed in by the user.
#[derive(Debug, Clone, Default)]
pub struct PeerForm {
    pub pubkey: String,
    pub host: String,
}

pub struct Wizard {
    provider: Option<Arc<dyn WalletProvider>>,
    store: Arc<dyn Store>,
    catalog: &'static [FundingTarget],
    state: OnboardingState,
    loading: bool,
    form: PeerForm,
    reload_requested: Arc<AtomicBool>,
    listener: Option<EventHandle>,
}

impl Wizard {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, store: Arc<dyn Store>) -> Self {
        Self::with_catalog(provider, store, &FUNDING_TARGETS)
    }

    pub fn with_catalog(
        provider: Option<Arc<dyn WalletProvider>>,
        store: Arc<dyn Store>,
        catalog: &'static [FundingTarget],
    ) -> Self {
        Wizard {
            provider,
            store,
            catalog,
            state: OnboardingState::AwaitingWallet,
            loading: true,
            form: PeerForm::default(),
            reload_requested: Arc::new(AtomicBool::new(false)),
            listener: None,
        }
    }

    pub fn state(&self) -> &OnboardingState {
        &self.state
    }

    pub fn stage_index(&self) -> usize {
        self.state.stage_index()
    }

    /// Whether `initialize` is still running.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn form(&self) -> &PeerForm {
        &self.form
    }

    /// Minimum deposit advertised while waiting for funds.
    pub fn minimum_funding_sats(&self) -> Option<u64> {
        targets::minimum_funding_sats(self.catalog)
    }

    /// Set by the account-change listener. The host reacts by calling
    /// `initialize` again.
    pub fn needs_reload(&self) -> bool {
        self.reload_requested.load(Ordering::SeqCst)
    }

    /// Run the detection sequence: provider presence, authorization,
    /// capabilities, balance, funding-target eligibility. Every failure
    /// past the presence check lands in [`OnboardingState::Failed`].
    pub async fn initialize(&mut self) {
        self.loading = true;
        self.reload_requested.store(false, Ordering::SeqCst);
        if let Some(listener) = self.listener.take() {
            listener.cancel();
        }
        self.state = OnboardingState::AwaitingWallet;
        self.form = PeerForm::default();

        if let Err(e) = self.try_initialize().await {
            self.state = OnboardingState::Failed(e.to_string());
        }
        self.loading = false;
    }

    async fn try_initialize(&mut self) -> Result<(), Error> {
        let provider = match &self.provider {
            Some(p) => p.clone(),
            // No wallet yet. Not an error: the display tells the user how
            // to get one, and the flow is restarted once it is there.
            None => return Ok(()),
        };

        provider.enable().await?;

        let info = provider.get_info().await?;
        if REQUIRED_METHODS.iter().any(|m| !info.supports(m)) {
            if provider.is_enabled().await? {
                // The user may switch to an account whose node does accept
                // the methods, re-run the flow when that happens.
                let reload = self.reload_requested.clone();
                self.listener = Some(provider.on_account_changed(Arc::new(move || {
                    reload.store(true, Ordering::SeqCst);
                }))?);
            }
            self.state = OnboardingState::CapabilityMissing;
            return Ok(());
        }
        info!("provider connected to node '{}'", info.node.alias);

        let balance = provider.wallet_balance().await?;
        let eligible = targets::eligible_targets(self.catalog, balance.confirmed);
        if !eligible.is_empty() {
            self.state = OnboardingState::ReadyToConnect {
                balance,
                eligible,
                error: None,
            };
            return Ok(());
        }

        // Not enough confirmed funds for any target: hand out a deposit
        // address, the cached one if a previous run already got one.
        let address = match self.store.get(DEPOSIT_ADDRESS_KEY)? {
            Some(address) => address,
            None => {
                let res = provider.new_address().await?;
                self.store.set(DEPOSIT_ADDRESS_KEY, &res.address)?;
                res.address
            }
        };
        self.state = OnboardingState::AwaitingFunds { balance, address };
        Ok(())
    }

    /// Copy a recommended target into the connect form. Out-of-range
    /// indices are ignored.
    pub fn select_target(&mut self, index: usize) {
        if let OnboardingState::ReadyToConnect { eligible, .. } = &self.state {
            if let Some(target) = eligible.get(index) {
                self.form.pubkey = target.pubkey.to_string();
                self.form.host = target.host.to_string();
            }
        }
    }

    /// Fill the connect form by hand.
    pub fn set_peer(&mut self, pubkey: &str, host: &str) {
        self.form.pubkey = pubkey.trim().to_string();
        self.form.host = host.trim().to_string();
    }

    /// Connect to the selected peer and open the channel. Only valid in
    /// [`OnboardingState::ReadyToConnect`]; failures leave the state there
    /// so the user can edit the form and retry.
    pub async fn open_channel(&mut self) {
        if !matches!(self.state, OnboardingState::ReadyToConnect { .. }) {
            return;
        }
        let provider = match &self.provider {
            Some(p) => p.clone(),
            None => {
                self.record_open_error(ProviderError::Unavailable.to_string());
                return;
            }
        };
        if self.form.pubkey.is_empty() || self.form.host.is_empty() {
            self.record_open_error(
                "Please fill out pubkey and host of node you wish to connect to".to_string(),
            );
            return;
        }
        let node_pubkey = match codec::encode_pubkey(&self.form.pubkey) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.record_open_error(format!("Invalid pubkey: {}", e));
                return;
            }
        };

        // The node may well already be connected to this peer, in which
        // case the provider errors. Not fatal.
        if let Err(e) = provider
            .connect_peer(&self.form.pubkey, &self.form.host)
            .await
        {
            warn!("connectpeer '{}' failed: {}", self.form.pubkey, e);
        }

        match provider.open_channel(&node_pubkey).await {
            Ok(res) => match codec::decode_funding_txid(&res.funding_txid_bytes) {
                Ok(funding_txid) => {
                    info!("channel opening, funding transaction {}", funding_txid);
                    self.state = OnboardingState::ChannelOpening { funding_txid };
                }
                Err(e) => self
                    .record_open_error(format!("Failed to decode funding transaction id: {}", e)),
            },
            Err(e) => self.record_open_error(format!("Failed to open channel: {}", e)),
        }
    }

    fn record_open_error(&mut self, message: String) {
        if let OnboardingState::ReadyToConnect { error, .. } = &mut self.state {
            *error = Some(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::client::{Gateway, Request};
    use crate::store::MemoryStore;
    use crate::testutils::Wallet;

    use serde_json::json;

    fn getinfo_ok(alias: &str) -> serde_json::Value {
        json!({
            "methods": ["request.walletbalance", "request.newaddress"],
            "node": {"alias": alias},
        })
    }

    fn balance_ok(confirmed: &str, unconfirmed: &str) -> serde_json::Value {
        json!({"confirmed_balance": confirmed, "unconfirmed_balance": unconfirmed})
    }

    fn provider_from(wallet: Wallet) -> Arc<dyn WalletProvider> {
        Arc::new(Gateway::new(wallet.run()))
    }

    fn eligible_titles(state: &OnboardingState) -> Vec<&'static str> {
        match state {
            OnboardingState::ReadyToConnect { eligible, .. } => {
                eligible.iter().map(|t| t.title).collect()
            }
            other => panic!("expected ReadyToConnect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn no_provider() {
        let mut wizard = Wizard::new(None, Arc::new(MemoryStore::new()));
        assert!(wizard.is_loading());

        wizard.initialize().await;

        assert!(!wizard.is_loading());
        assert!(matches!(wizard.state(), OnboardingState::AwaitingWallet));
        assert_eq!(wizard.stage_index(), 0);
    }

    #[tokio::test]
    async fn capability_missing_then_account_change() {
        let wallet = Wallet::new(vec![
            (
                Some(json!({"method": "enable", "params": Option::<Request>::None})),
                Ok(json!({})),
            ),
            (
                Some(json!({"method": "getinfo", "params": Option::<Request>::None})),
                Ok(json!({
                    "methods": ["request.connectpeer"],
                    "node": {"alias": "alice"},
                })),
            ),
            (
                Some(json!({"method": "isenabled", "params": Option::<Request>::None})),
                Ok(json!(true)),
            ),
            // Second run, after the account switch.
            (None, Ok(json!({}))),
            (None, Ok(getinfo_ok("bob"))),
            (
                Some(json!({"method": "walletbalance", "params": Option::<Request>::None})),
                Ok(balance_ok("600000", "0")),
            ),
        ]);
        let gateway = Arc::new(Gateway::new(wallet.run()));
        let provider: Arc<dyn WalletProvider> = gateway.clone();
        let mut wizard = Wizard::new(Some(provider), Arc::new(MemoryStore::new()));

        wizard.initialize().await;
        assert!(matches!(wizard.state(), OnboardingState::CapabilityMissing));
        assert_eq!(wizard.stage_index(), 0);
        assert!(!wizard.needs_reload());

        gateway.notify_account_changed();
        assert!(wizard.needs_reload());

        wizard.initialize().await;
        assert!(!wizard.needs_reload());
        assert_eq!(
            eligible_titles(wizard.state()),
            vec!["ACINQ", "deezy", "bitfinex", "kappa", "Voltage"],
        );
        assert_eq!(wizard.stage_index(), 2);
    }

    #[tokio::test]
    async fn deposit_address_cached() {
        let store = Arc::new(MemoryStore::new());

        let wallet = Wallet::new(vec![
            (None, Ok(json!({}))),
            (None, Ok(getinfo_ok("carol"))),
            (None, Ok(balance_ok("100000", "250000"))),
            (
                Some(json!({"method": "newaddress", "params": Option::<Request>::None})),
                Ok(json!({"address": "bc1qfresh"})),
            ),
        ]);
        let mut wizard = Wizard::new(Some(provider_from(wallet)), store.clone());
        wizard.initialize().await;
        match wizard.state() {
            OnboardingState::AwaitingFunds { balance, address } => {
                assert_eq!(address, "bc1qfresh");
                assert_eq!(balance.confirmed, 100_000);
                assert_eq!(balance.unconfirmed, 250_000);
            }
            other => panic!("expected AwaitingFunds, got {:?}", other),
        }
        assert_eq!(wizard.stage_index(), 1);
        assert_eq!(wizard.minimum_funding_sats(), Some(350_000));

        // A later visit reuses the stored address: no `newaddress` request
        // is scripted, the mock would panic on one.
        let wallet = Wallet::new(vec![
            (None, Ok(json!({}))),
            (None, Ok(getinfo_ok("carol"))),
            (None, Ok(balance_ok("100000", "0"))),
        ]);
        let mut wizard = Wizard::new(Some(provider_from(wallet)), store);
        wizard.initialize().await;
        match wizard.state() {
            OnboardingState::AwaitingFunds { address, .. } => assert_eq!(address, "bc1qfresh"),
            other => panic!("expected AwaitingFunds, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn balance_at_exact_minimum_not_eligible() {
        let wallet = Wallet::new(vec![
            (None, Ok(json!({}))),
            (None, Ok(getinfo_ok("carol"))),
            (None, Ok(balance_ok("350000", "0"))),
            (None, Ok(json!({"address": "bc1qexact"}))),
        ]);
        let mut wizard = Wizard::new(Some(provider_from(wallet)), Arc::new(MemoryStore::new()));
        wizard.initialize().await;
        assert!(matches!(
            wizard.state(),
            OnboardingState::AwaitingFunds { .. }
        ));
    }

    #[tokio::test]
    async fn open_channel_failure_then_retry() {
        let acinq_pubkey = FUNDING_TARGETS[0].pubkey;
        let wallet = Wallet::new(vec![
            (None, Ok(json!({}))),
            (None, Ok(getinfo_ok("dave"))),
            (None, Ok(balance_ok("600000", "0"))),
            // First attempt: peer connects, channel open is refused.
            (None, Ok(json!({}))),
            (
                None,
                Err(ProviderError::Rpc(2, "not enough witness outputs".to_string())),
            ),
            // Retry: the node is already connected to the peer, which is
            // swallowed, and the channel open goes through.
            (
                None,
                Err(ProviderError::Rpc(1, "already connected to peer".to_string())),
            ),
            (
                Some(json!({"method": "openchannel", "params": {
                    "node_pubkey": codec::encode_pubkey(acinq_pubkey).unwrap(),
                    "fund_max": true,
                }})),
                Ok(json!({"funding_txid_bytes": "TWFu"})),
            ),
        ]);
        let mut wizard = Wizard::new(Some(provider_from(wallet)), Arc::new(MemoryStore::new()));
        wizard.initialize().await;

        // Nothing selected yet: no request is issued.
        wizard.open_channel().await;
        match wizard.state() {
            OnboardingState::ReadyToConnect { error: Some(e), .. } => {
                assert!(e.contains("Please fill out pubkey and host"), "{}", e);
            }
            other => panic!("expected ReadyToConnect with error, got {:?}", other),
        }

        wizard.select_target(0);
        assert_eq!(wizard.form().pubkey, acinq_pubkey);
        assert_eq!(wizard.form().host, FUNDING_TARGETS[0].host);

        wizard.open_channel().await;
        match wizard.state() {
            OnboardingState::ReadyToConnect { error: Some(e), .. } => {
                assert!(e.contains("Failed to open channel"), "{}", e);
                assert!(e.contains("not enough witness outputs"), "{}", e);
            }
            other => panic!("expected ReadyToConnect with error, got {:?}", other),
        }
        assert_eq!(wizard.stage_index(), 2);

        wizard.open_channel().await;
        match wizard.state() {
            OnboardingState::ChannelOpening { funding_txid } => {
                // base64("Man"), byte-reversed.
                assert_eq!(funding_txid, "6e614d");
            }
            other => panic!("expected ChannelOpening, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_manual_pubkey() {
        let wallet = Wallet::new(vec![
            (None, Ok(json!({}))),
            (None, Ok(getinfo_ok("dave"))),
            (None, Ok(balance_ok("600000", "0"))),
        ]);
        let mut wizard = Wizard::new(Some(provider_from(wallet)), Arc::new(MemoryStore::new()));
        wizard.initialize().await;

        // Not hex: rejected before any request goes out.
        wizard.set_peer("not a pubkey", "peer:9735");
        wizard.open_channel().await;
        match wizard.state() {
            OnboardingState::ReadyToConnect { error: Some(e), .. } => {
                assert!(e.contains("Invalid pubkey"), "{}", e);
            }
            other => panic!("expected ReadyToConnect with error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn enable_refused() {
        let wallet = Wallet::new(vec![(
            None,
            Err(ProviderError::Unexpected("user rejected".to_string())),
        )]);
        let mut wizard = Wizard::new(Some(provider_from(wallet)), Arc::new(MemoryStore::new()));
        wizard.initialize().await;
        match wizard.state() {
            OnboardingState::Failed(e) => assert!(e.contains("user rejected"), "{}", e),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(wizard.stage_index(), 0);
    }

    #[tokio::test]
    async fn balance_fetch_failure() {
        let wallet = Wallet::new(vec![
            (None, Ok(json!({}))),
            (None, Ok(getinfo_ok("erin"))),
            (
                None,
                Err(ProviderError::Transport(None, "connection reset".to_string())),
            ),
        ]);
        let mut wizard = Wizard::new(Some(provider_from(wallet)), Arc::new(MemoryStore::new()));
        wizard.initialize().await;
        match wizard.state() {
            OnboardingState::Failed(e) => assert!(e.contains("connection reset"), "{}", e),
            other => panic!("expected Failed, got {:?}", other),
        }
    }
}
