use crate::error::GateError;
use crate::ipc::ClientMsg;

/// Input to the verification controller. Popup-originated variants carry the
/// generation of the popup that sent them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The user started logging in inside the popup.
    Attempt(u64),
    /// The popup reported a completed login.
    Success(u64),
    /// The popup reported it is closing without a login.
    ClosedWithoutLogin(u64),
    /// The closure poller observed the popup window gone.
    PopupClosed(u64),
    /// The opener window regained focus.
    FocusRegained,
}

impl Signal {
    /// The generation this signal belongs to, if it is generation-scoped.
    pub fn generation(&self) -> Option<u64> {
        match *self {
            Signal::Attempt(g)
            | Signal::Success(g)
            | Signal::ClosedWithoutLogin(g)
            | Signal::PopupClosed(g) => Some(g),
            Signal::FocusRegained => None,
        }
    }

    /// Convert a popup message into a signal.
    ///
    /// Popup messages without a generation tag, unknown message types and
    /// control messages are all rejected as malformed.
    pub fn from_popup(msg: &ClientMsg) -> Result<Signal, GateError> {
        let tagged = |generation: Option<u64>, make: fn(u64) -> Signal| {
            generation.map(make).ok_or(GateError::MalformedSignal)
        };
        match *msg {
            ClientMsg::LoginSuccess { generation } => tagged(generation, Signal::Success),
            ClientMsg::LoginAttempt { generation } => tagged(generation, Signal::Attempt),
            ClientMsg::PopupClosedWithoutLogin { generation } => {
                tagged(generation, Signal::ClosedWithoutLogin)
            }
            _ => Err(GateError::MalformedSignal),
        }
    }
}
