use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WcConnectionStatus {
    Disconnected,
    Pairing,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WcConnectionAction {
    Pair,
    Approve,
    Cancel,
    Restore,
    Disconnect,
}

pub fn connection_transition(
    from: WcConnectionStatus,
    action: WcConnectionAction,
) -> Result<(WcConnectionStatus, &'static str), PortError> {
    use WcConnectionAction as A;
    use WcConnectionStatus as S;

    let next = match (from, action) {
        (S::Disconnected, A::Pair) => (S::Pairing, "session proposed"),
        (S::Pairing, A::Approve) => (S::Connected, "session approved"),
        (S::Pairing, A::Cancel) => (S::Disconnected, "pairing cancelled"),
        (S::Disconnected, A::Restore) => (S::Connected, "session restored"),
        (_, A::Disconnect) => (S::Disconnected, "session disconnected"),
        (from, action) => {
            return Err(PortError::Validation(format!(
                "illegal wc connection transition: {from:?} --{action:?}-->"
            )))
        }
    };
    Ok(next)
}
