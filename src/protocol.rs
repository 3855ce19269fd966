/// Protocol version carried in every request header.
pub const VERSION: u8 = 2;

pub const CLIENT_ID_SIZE: usize = 16;
pub const USERNAME_SIZE: usize = 255;
pub const PUBLIC_KEY_SIZE: usize = 160;
pub const SYMMETRIC_KEY_SIZE: usize = 16;

/// client id (16) + version (1) + code (2) + payload size (4)
pub const REQUEST_HEADER_SIZE: usize = CLIENT_ID_SIZE + 1 + 2 + 4;
/// version (1) + code (2) + payload size (4)
pub const RESPONSE_HEADER_SIZE: usize = 1 + 2 + 4;

/// One directory entry: client id followed by the fixed-width name field.
pub const PEER_RECORD_SIZE: usize = CLIENT_ID_SIZE + USERNAME_SIZE;
/// sender (16) + message id (4) + kind (1) + content size (4)
pub const QUEUED_MESSAGE_HEADER_SIZE: usize = CLIENT_ID_SIZE + 4 + 1 + 4;

/// Request codes understood by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum RequestCode {
    Register = 600,
    ClientList = 601,
    PublicKey = 602,
    SendMessage = 603,
    WaitingMessages = 604,
}

impl RequestCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            600 => Some(Self::Register),
            601 => Some(Self::ClientList),
            602 => Some(Self::PublicKey),
            603 => Some(Self::SendMessage),
            604 => Some(Self::WaitingMessages),
            _ => None,
        }
    }
}

/// Response codes sent back by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum ResponseCode {
    RegisterOk = 2100,
    ClientList = 2101,
    PublicKey = 2102,
    MessageSent = 2103,
    WaitingMessages = 2104,
    GeneralError = 9000,
}

impl ResponseCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            2100 => Some(Self::RegisterOk),
            2101 => Some(Self::ClientList),
            2102 => Some(Self::PublicKey),
            2103 => Some(Self::MessageSent),
            2104 => Some(Self::WaitingMessages),
            9000 => Some(Self::GeneralError),
            _ => None,
        }
    }
}

/// Kind byte of a relayed message.
///
/// Bytes outside the known set are kept as `Unknown` so a queued message is
/// never lost because a newer peer used a kind this client does not know.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Ask the recipient to send a symmetric key. Content is empty.
    KeyRequest,
    /// A symmetric key wrapped with the recipient's RSA public key.
    KeySend,
    /// AES encrypted text.
    Text,
    /// AES encrypted file contents.
    File,
    Unknown(u8),
}

impl MessageKind {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Self::KeyRequest,
            2 => Self::KeySend,
            3 => Self::Text,
            4 => Self::File,
            other => Self::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::KeyRequest => 1,
            Self::KeySend => 2,
            Self::Text => 3,
            Self::File => 4,
            Self::Unknown(other) => other,
        }
    }
}
