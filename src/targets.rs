//! The catalog of recommended funding targets.
//!
//! Well-known lightning peers worth opening a first channel to. The catalog
//! is compiled in, there is no configuration knob for it.

/// A recommended peer, identified by its public key and network address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingTarget {
    pub title: &'static str,
    /// 33-byte compressed public key, hex-encoded.
    pub pubkey: &'static str,
    /// "ip:port" or "host:port".
    pub host: &'static str,
    /// Confirmed on-chain balance required before we suggest this peer,
    /// covering its minimum channel size plus the funding transaction fee.
    pub minimum_sats: u64,
}

pub const FUNDING_TARGETS: [FundingTarget; 6] = [
    FundingTarget {
        title: "ACINQ",
        pubkey: "03864ef025fde8fb587d989186ce6a4a186895ee44a926bfc370e2c366597a3f8f",
        host: "3.33.236.230:9735",
        minimum_sats: 550_000,
    },
    FundingTarget {
        title: "deezy",
        pubkey: "024bfaf0cabe7f874fd33ebf7c6f4e5385971fc504ef3f492432e9e3ec77e1b5cf",
        host: "52.1.72.207:9735",
        minimum_sats: 550_000,
    },
    FundingTarget {
        title: "bitfinex",
        pubkey: "033d8656219478701227199cbd6f670335c8d408a92ae88b962c49d4dc0e83e025",
        host: "34.65.85.39:9735",
        minimum_sats: 550_000,
    },
    FundingTarget {
        title: "kappa",
        pubkey: "038d98b9969fbed53784a36617eb489a59ab76dc9406e73ccd57e881a7b8b053de",
        host: "83.85.142.36:9735",
        minimum_sats: 350_000,
    },
    FundingTarget {
        title: "Voltage",
        pubkey: "025f1456582e70c4c06b61d5c8ed3ce229e6d0db538be337a2dc6d163b0ebc05a5",
        host: "52.89.237.109:9735",
        minimum_sats: 350_000,
    },
    FundingTarget {
        title: "Kraken",
        pubkey: "02f1a8c87607f415c8f22c00593002775941dea48869ce23096af27b0cfdcc0b69",
        host: "52.13.118.208:9735",
        minimum_sats: 10_100_000,
    },
];

/// Targets affordable with the given confirmed balance. Eligibility is a
/// strict comparison: a balance exactly at the minimum does not qualify.
pub fn eligible_targets(
    catalog: &'static [FundingTarget],
    confirmed_sats: u64,
) -> Vec<&'static FundingTarget> {
    catalog
        .iter()
        .filter(|t| confirmed_sats > t.minimum_sats)
        .collect()
}

/// The cheapest minimum across the catalog, advertised to the user as the
/// amount to deposit.
pub fn minimum_funding_sats(catalog: &[FundingTarget]) -> Option<u64> {
    catalog.iter().map(|t| t.minimum_sats).min()
}
