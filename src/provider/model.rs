//! Types for the provider's responses.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer};

fn deserialize_fromstr<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let string = String::deserialize(deserializer)?;
    T::from_str(&string)
        .map_err(|e| de::Error::custom(format!("Error parsing '{}': {}", string, e)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetInfoResult {
    /// Remote methods this provider will accept, e.g. `request.walletbalance`.
    pub methods: HashSet<String>,
    pub node: NodeInfo,
}

impl GetInfoResult {
    pub fn supports(&self, method: &str) -> bool {
        self.methods.contains(method)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfo {
    pub alias: String,
    #[serde(default)]
    pub pubkey: Option<String>,
}

/// The node's on-chain balance. The provider serializes amounts as decimal
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WalletBalance {
    #[serde(rename = "confirmed_balance", deserialize_with = "deserialize_fromstr")]
    pub confirmed: u64,
    #[serde(
        rename = "unconfirmed_balance",
        deserialize_with = "deserialize_fromstr"
    )]
    pub unconfirmed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetAddressResult {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenChannelResult {
    /// Funding transaction id, base64-encoded raw bytes in wire order.
    pub funding_txid_bytes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_from_decimal_strings() {
        let balance: WalletBalance = serde_json::from_str(
            r#"{"confirmed_balance": "600000", "unconfirmed_balance": "0"}"#,
        )
        .unwrap();
        assert_eq!(balance.confirmed, 600_000);
        assert_eq!(balance.unconfirmed, 0);

        serde_json::from_str::<WalletBalance>(
            r#"{"confirmed_balance": "not a number", "unconfirmed_balance": "0"}"#,
        )
        .unwrap_err();
        // The provider sends strings, not numbers.
        serde_json::from_str::<WalletBalance>(
            r#"{"confirmed_balance": 600000, "unconfirmed_balance": 0}"#,
        )
        .unwrap_err();
    }

    #[test]
    fn info_methods() {
        let info: GetInfoResult = serde_json::from_str(
            r#"{
                "methods": ["request.walletbalance", "request.newaddress"],
                "node": {"alias": "carol"}
            }"#,
        )
        .unwrap();
        assert!(info.supports("request.walletbalance"));
        assert!(!info.supports("request.connectpeer"));
        assert_eq!(info.node.alias, "carol");
        assert_eq!(info.node.pubkey, None);
    }
}
