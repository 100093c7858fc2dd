//! Node kind: whether a peer mines and serves the chain, or only wallets
//! (spec.md GLOSSARY, §4.7).

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Mines, serves chain sync requests.
    FullNode,
    /// Does not mine, does not serve chain sync requests.
    WalletNode,
}

impl NodeKind {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            NodeKind::FullNode => "FULL_NODE",
            NodeKind::WalletNode => "WALLET_NODE",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node kind: {0}")]
pub struct ParseNodeKindError(pub String);

impl FromStr for NodeKind {
    type Err = ParseNodeKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL_NODE" => Ok(NodeKind::FullNode),
            "WALLET_NODE" => Ok(NodeKind::WalletNode),
            other => Err(ParseNodeKindError(other.to_string())),
        }
    }
}
