use crate::{CLIENT_ID_SIZE, Error};
use std::fmt;

/// 16-byte identifier the relay assigns to a client at registration.
///
/// Equality is byte-exact. The all-zero value is only ever sent with the
/// registration request, before the server has assigned an id.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId([u8; CLIENT_ID_SIZE]);

impl ClientId {
    /// The placeholder id used before registration.
    pub const UNASSIGNED: Self = Self([0u8; CLIENT_ID_SIZE]);

    pub fn as_bytes(&self) -> &[u8; CLIENT_ID_SIZE] {
        &self.0
    }

    pub fn to_bytes(&self) -> [u8; CLIENT_ID_SIZE] {
        self.0
    }

    pub fn is_unassigned(&self) -> bool {
        self.0 == [0u8; CLIENT_ID_SIZE]
    }

    /// Reads an id from the first 16 bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let id: [u8; CLIENT_ID_SIZE] = bytes.get(..CLIENT_ID_SIZE)?.try_into().ok()?;
        Some(Self(id))
    }

    /// Lowercase hex, 32 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(encoded: &str) -> Result<Self, Error> {
        let mut id = [0u8; CLIENT_ID_SIZE];
        hex::decode_to_slice(encoded.trim(), &mut id)
            .map_err(|e| Error::Config(format!("Invalid client id {encoded:?}: {e}")))?;
        Ok(Self(id))
    }
}

impl From<[u8; CLIENT_ID_SIZE]> for ClientId {
    fn from(bytes: [u8; CLIENT_ID_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.to_hex())
    }
}
