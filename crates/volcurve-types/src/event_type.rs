//! Intraday event type definitions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Intraday event type requested from the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Trades.
    #[default]
    Trade,
    /// Bid quotes.
    Bid,
    /// Ask quotes.
    Ask,
    /// Best bid quotes.
    BidBest,
    /// Best ask quotes.
    AskBest,
    /// Mid price.
    MidPrice,
    /// At-trade quotes.
    AtTrade,
    /// Best bid.
    BestBid,
    /// Best ask.
    BestAsk,
}

impl EventType {
    /// Returns the event type in gateway spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trade => "TRADE",
            Self::Bid => "BID",
            Self::Ask => "ASK",
            Self::BidBest => "BID_BEST",
            Self::AskBest => "ASK_BEST",
            Self::MidPrice => "MID_PRICE",
            Self::AtTrade => "AT_TRADE",
            Self::BestBid => "BEST_BID",
            Self::BestAsk => "BEST_ASK",
        }
    }

    /// Returns all available event types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Trade,
            Self::Bid,
            Self::Ask,
            Self::BidBest,
            Self::AskBest,
            Self::MidPrice,
            Self::AtTrade,
            Self::BestBid,
            Self::BestAsk,
        ]
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = EventTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "TRADE" | "TRADES" => Ok(Self::Trade),
            "BID" => Ok(Self::Bid),
            "ASK" => Ok(Self::Ask),
            "BID_BEST" => Ok(Self::BidBest),
            "ASK_BEST" => Ok(Self::AskBest),
            "MID_PRICE" | "MID" => Ok(Self::MidPrice),
            "AT_TRADE" => Ok(Self::AtTrade),
            "BEST_BID" => Ok(Self::BestBid),
            "BEST_ASK" => Ok(Self::BestAsk),
            _ => Err(EventTypeParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTypeParseError(String);

impl std::fmt::Display for EventTypeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid event type '{}', expected one of: TRADE, BID, ASK, BID_BEST, ASK_BEST, MID_PRICE, AT_TRADE, BEST_BID, BEST_ASK",
            self.0
        )
    }
}

impl std::error::Error for EventTypeParseError {}
