use serde::{Deserialize, Serialize};

/// Fee charged to clear an active cooldown, in the chain's native token.
pub const COOLDOWN_SKIP_FEE: &str = "0.01";

/// Opaque identifier returned by the payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// Abbreviated `0x12345678...abcdef` form for status messages.
    pub fn shortened(&self) -> String {
        let hash = &self.0;
        if hash.len() <= 14 {
            return hash.clone();
        }
        format!("{}...{}", &hash[..8], &hash[hash.len() - 6..])
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure from the payment collaborator. `Rejected` is the user declining
/// or the wallet refusing; `Unavailable` is the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentError {
    Rejected { reason: String },
    Unavailable { reason: String },
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { reason } => write!(f, "payment rejected: {reason}"),
            Self::Unavailable { reason } => write!(f, "payment unavailable: {reason}"),
        }
    }
}

impl std::error::Error for PaymentError {}

/// "Send value to an address" collaborator. The wallet bridge and chain
/// plumbing live behind this seam; the board only sees a transaction id.
pub trait PaymentGateway {
    fn pay(&self, fee: &str) -> Result<TransactionId, PaymentError>;
}
