pub mod aggregator;
pub mod bridge;
pub mod chains;
pub mod clock;
pub mod config;
pub mod proposal;
pub mod state;
pub mod wc;

pub use aggregator::{
    InjectedExtensionWallet, InjectedWalletProvider, WalletAggregator, WalletConnectProvider,
};
pub use bridge::{setup_saturn_connect, SaturnConnectBridge};
pub use chains::{caip2_from_genesis, ChainInfo, ChainTable};
pub use clock::SystemClock;
pub use config::GatewayConfig;
pub use proposal::{Proposal, ProposalType};
pub use state::{AppState, SaturnInstance};
pub use wc::{
    WalletConnectConfig, WalletConnectSigner, WalletConnectWallet, SIGN_MESSAGE,
    SIGN_TRANSACTION,
};
