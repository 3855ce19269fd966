use crate::{ClientId, SymmetricKey};
use std::collections::HashMap;
use tracing::debug;

/// Key-exchange state of one peer, derived from the key store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerState {
    /// No symmetric key yet. Text and files cannot be sent.
    NoKey,
    /// A symmetric key is held and content is AES encrypted.
    KeyEstablished,
}

/// Symmetric session keys, one per peer.
///
/// A new key for a peer replaces the old one. Keys live for the life of the
/// process and are wiped when dropped.
#[derive(Debug, Default)]
pub struct KeyStore {
    sessions: HashMap<ClientId, SymmetricKey>, // peer -> key
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `key` for `peer`, replacing any previous key.
    pub fn establish(&mut self, peer: ClientId, key: SymmetricKey) {
        if self.sessions.insert(peer, key).is_some() {
            debug!(%peer, "replaced symmetric key");
        } else {
            debug!(%peer, "stored symmetric key");
        }
    }

    pub fn lookup(&self, peer: &ClientId) -> Option<&SymmetricKey> {
        self.sessions.get(peer)
    }

    pub fn has(&self, peer: &ClientId) -> bool {
        self.sessions.contains_key(peer)
    }

    /// Drops the key for `peer`, returning the peer to `NoKey`.
    pub fn forget(&mut self, peer: &ClientId) -> bool {
        self.sessions.remove(peer).is_some()
    }

    pub fn state(&self, peer: &ClientId) -> PeerState {
        if self.has(peer) {
            PeerState::KeyEstablished
        } else {
            PeerState::NoKey
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
