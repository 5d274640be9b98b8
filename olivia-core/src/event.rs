//! Host-facing event stream, replacing a two-optional-argument
//! callback with a proper sum type.

/// Lifecycle state of the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemState {
    Inactive,
    Idle,
    Transmitting,
}

/// Events delivered to a host-supplied callback.
#[derive(Debug, Clone)]
pub enum Event {
    StateChanged(ModemState),
    MessageReceived(String),
}
