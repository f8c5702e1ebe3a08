//! Subscription types, tracking, and matching.

use crate::shared::SymbolPair;

/// Parameters for subscribing to a market stream.
///
/// Stream names follow the Binance convention: `<symbol>@aggTrade`,
/// `<symbol>@trade` (lowercased symbol).
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum SubscribeParams {
    AggTrade { symbols: Vec<SymbolPair> },
    Trade { symbols: Vec<SymbolPair> },
}

/// Parameters for unsubscribing from a market stream.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum UnsubscribeParams {
    AggTrade { symbols: Vec<SymbolPair> },
    Trade { symbols: Vec<SymbolPair> },
}

impl SubscribeParams {
    /// One aggregate-trade stream for a single symbol — what the session
    /// controller subscribes to.
    pub fn agg_trade(symbol: SymbolPair) -> Self {
        SubscribeParams::AggTrade {
            symbols: vec![symbol],
        }
    }

    /// Wire stream names for the subscribe request.
    pub fn stream_names(&self) -> Vec<String> {
        match self {
            SubscribeParams::AggTrade { symbols } => {
                symbols.iter().map(|s| s.stream_name()).collect()
            }
            SubscribeParams::Trade { symbols } => symbols
                .iter()
                .map(|s| format!("{}@trade", s.as_str().to_ascii_lowercase()))
                .collect(),
        }
    }
}

impl UnsubscribeParams {
    pub fn stream_names(&self) -> Vec<String> {
        match self {
            UnsubscribeParams::AggTrade { symbols } => {
                symbols.iter().map(|s| s.stream_name()).collect()
            }
            UnsubscribeParams::Trade { symbols } => symbols
                .iter()
                .map(|s| format!("{}@trade", s.as_str().to_ascii_lowercase()))
                .collect(),
        }
    }
}

/// Trait for subscription types that can be tracked and matched.
pub trait Subscription {
    fn to_subscribe_params(&self) -> SubscribeParams;
    fn to_unsubscribe_params(&self) -> UnsubscribeParams;
    fn matches_unsubscribe(&self, unsub: &UnsubscribeParams) -> bool;
    fn subscription_key(&self) -> String;
}

impl Subscription for SubscribeParams {
    fn to_subscribe_params(&self) -> SubscribeParams {
        self.clone()
    }

    fn to_unsubscribe_params(&self) -> UnsubscribeParams {
        match self {
            SubscribeParams::AggTrade { symbols } => UnsubscribeParams::AggTrade {
                symbols: symbols.clone(),
            },
            SubscribeParams::Trade { symbols } => UnsubscribeParams::Trade {
                symbols: symbols.clone(),
            },
        }
    }

    fn matches_unsubscribe(&self, unsub: &UnsubscribeParams) -> bool {
        use std::collections::HashSet;
        match (self, unsub) {
            (
                SubscribeParams::AggTrade { symbols: sub },
                UnsubscribeParams::AggTrade { symbols: unsub },
            )
            | (
                SubscribeParams::Trade { symbols: sub },
                UnsubscribeParams::Trade { symbols: unsub },
            ) => {
                let sub_set: HashSet<_> = sub.iter().collect();
                let unsub_set: HashSet<_> = unsub.iter().collect();
                sub_set == unsub_set
            }
            _ => false,
        }
    }

    fn subscription_key(&self) -> String {
        let mut names = self.stream_names();
        names.sort();
        names.join(",")
    }
}
