use crate::{CLIENT_ID_SIZE, ClientId, PEER_RECORD_SIZE, USERNAME_SIZE};

/// One entry of the relay's client directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerRecord {
    pub id: ClientId,
    pub name: String,
}

impl PeerRecord {
    /// Format: [client id (16)][name, zero padded to 255]
    pub fn to_bytes(&self) -> [u8; PEER_RECORD_SIZE] {
        let mut bytes = [0u8; PEER_RECORD_SIZE];
        bytes[..CLIENT_ID_SIZE].copy_from_slice(self.id.as_bytes());

        let name = self.name.as_bytes();
        let len = name.len().min(USERNAME_SIZE - 1);
        bytes[CLIENT_ID_SIZE..CLIENT_ID_SIZE + len].copy_from_slice(&name[..len]);

        bytes
    }

    fn from_record(record: &[u8]) -> Option<Self> {
        let id = ClientId::from_slice(record)?;
        let field = record.get(CLIENT_ID_SIZE..PEER_RECORD_SIZE)?;
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());

        Some(Self {
            id,
            name: String::from_utf8_lossy(&field[..end]).into_owned(),
        })
    }
}

/// Decodes a client list payload into records, in payload order.
///
/// Reading stops as soon as fewer than 271 bytes remain. Duplicate ids are
/// passed through unchanged.
pub fn parse_client_list(payload: &[u8]) -> Vec<PeerRecord> {
    payload
        .chunks_exact(PEER_RECORD_SIZE)
        .filter_map(PeerRecord::from_record)
        .collect()
}

/// The most recently fetched directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directory {
    peers: Vec<PeerRecord>,
}

impl Directory {
    pub fn from_payload(payload: &[u8]) -> Self {
        Self {
            peers: parse_client_list(payload),
        }
    }

    pub fn peers(&self) -> &[PeerRecord] {
        &self.peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// First entry with exactly this name.
    pub fn find_by_name(&self, name: &str) -> Option<&PeerRecord> {
        self.peers.iter().find(|peer| peer.name == name)
    }

    pub fn name_of(&self, id: &ClientId) -> Option<&str> {
        self.peers
            .iter()
            .find(|peer| &peer.id == id)
            .map(|peer| peer.name.as_str())
    }
}

impl From<Vec<PeerRecord>> for Directory {
    fn from(peers: Vec<PeerRecord>) -> Self {
        Self { peers }
    }
}
