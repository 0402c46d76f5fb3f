use thiserror::Error;

/// Failures talking to a MIDI device. All of them end the session.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to initialize MIDI {direction}: {reason}")]
    Open {
        direction: &'static str,
        reason: String,
    },

    #[error("no MIDI {0} devices found")]
    NoPorts(&'static str),

    #[error("no MIDI {direction} port matching {wanted:?}")]
    PortNotFound {
        direction: &'static str,
        wanted: String,
    },

    #[error("failed to connect to {port}: {reason}")]
    Connect { port: String, reason: String },

    #[error("failed to send {message:02X?}: {reason}")]
    Send { message: [u8; 3], reason: String },

    #[error("player stopped")]
    PlayerStopped,
}
