pub mod address;
pub mod domain;
pub mod message;
pub mod ports;
pub mod registry;
pub mod state_machine;

pub use address::{decode_address, same_account, AccountId, AddressError};
pub use domain::{
    DisconnectReason, InjectedAccount, InjectedMetadata, MultisigRecord, RequestId, SignPayload,
    SignRaw, SignerError, SignerResult, TabId, TimestampMs, WalletIdentity, WalletMetadata,
    WcConnectParams, WcMetadata, WcNamespace, WcRpcRequest, WcSession,
};
pub use message::{
    Hop, MessageOrigin, Operation, RuntimeRequest, RuntimeResponse, TabNotification,
    WindowEnvelope, WindowMessage,
};
pub use ports::{
    BaseWallet, ClockPort, OriginStore, PairingModal, PendingSession, PortError, RuntimePort,
    SignClient, SignClientFactory, Signer, TabMessenger, WalletProvider, WindowListener,
    WindowPort,
};
pub use registry::{AccountsCallback, InjectedWeb3, RegistryEntry, Unsubscribe, WalletRegistry};
pub use state_machine::{connection_transition, WcConnectionAction, WcConnectionStatus};
