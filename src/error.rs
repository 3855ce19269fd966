use crate::ClientId;

/// Errors that can occur while talking to the relay or processing messages.
///
/// Framing, truncation, server rejection and transport failures leave the
/// connection in an unknown state and end the current request. Every other
/// kind is local to one message or one action and can be reported to the user
/// without giving up on the rest of the work.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The response header could not be read in full.
    #[error("Invalid response header: {0}")]
    Framing(String),

    /// The transport did not deliver the payload length the header declared.
    #[error("Response payload truncated: expected {expected} bytes")]
    TruncatedPayload { expected: usize },

    /// The server answered with the general error code.
    #[error("Server responded with an error")]
    ServerRejected,

    /// The server answered with a code that does not belong to the request.
    #[error("Unexpected response code {actual} (expected {expected})")]
    UnexpectedResponse { expected: u16, actual: u16 },

    /// The underlying connection failed.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// RSA or AES decryption of received content failed.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Text or file content was addressed to a peer without a symmetric key.
    #[error("No symmetric key established with {0}")]
    ChannelNotEstablished(ClientId),

    /// No client with this name is in the latest directory.
    #[error("Client not found: {0}")]
    PeerNotFound(String),

    /// The action needs a registered identity.
    #[error("Client is not registered")]
    NotRegistered,

    /// Registration was attempted with an identity already assigned.
    #[error("Already registered as {0}")]
    AlreadyRegistered(String),

    /// A public key does not fit the fixed wire field.
    #[error("Invalid public key size: expected {expected} bytes, got {actual}")]
    InvalidPublicKey { expected: usize, actual: usize },

    /// Content does not fit the 4-byte length field.
    #[error("Payload of {0} bytes exceeds the protocol limit")]
    PayloadTooLarge(usize),

    /// A cryptographic operation other than decryption failed.
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// Local configuration or identity files are missing pieces or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The user left a required prompt empty.
    #[error("No {0} given")]
    MissingInput(&'static str),

    /// Random number generation failed.
    #[error("Random number generation failed")]
    Random,
}

impl Error {
    /// Returns true when the connection must be dropped after this error.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            Self::Framing(_)
                | Self::TruncatedPayload { .. }
                | Self::ServerRejected
                | Self::UnexpectedResponse { .. }
                | Self::Transport(_)
        )
    }
}

impl From<rsa::Error> for Error {
    fn from(value: rsa::Error) -> Self {
        Self::Crypto(value.to_string())
    }
}
