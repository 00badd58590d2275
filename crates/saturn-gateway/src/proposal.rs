use alloy::primitives::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalType {
    LocalCall,
    LocalTransfer,
    XcmCall,
    XcmTransfer,
    XcmBridge,
}

/// What the propose modal opens with. `data` is shaped by `proposalType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "proposalType", content = "data")]
pub enum Proposal {
    LocalCall {
        call: Bytes,
    },
    LocalTransfer {
        asset: String,
        amount: String,
        to: String,
    },
    XcmCall {
        chain: String,
        call: Bytes,
    },
    XcmTransfer {
        chain: String,
        asset: String,
        amount: String,
        to: String,
    },
    XcmBridge {
        from_chain: String,
        to_chain: String,
        asset: String,
        amount: String,
        to: String,
    },
}

impl Proposal {
    pub fn proposal_type(&self) -> ProposalType {
        match self {
            Self::LocalCall { .. } => ProposalType::LocalCall,
            Self::LocalTransfer { .. } => ProposalType::LocalTransfer,
            Self::XcmCall { .. } => ProposalType::XcmCall,
            Self::XcmTransfer { .. } => ProposalType::XcmTransfer,
            Self::XcmBridge { .. } => ProposalType::XcmBridge,
        }
    }
}
