use crate::{CLIENT_ID_SIZE, ClientId, MessageKind, QUEUED_MESSAGE_HEADER_SIZE};
use tracing::warn;

/// A message waiting for this client on the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedMessage {
    pub message_id: u32,
    pub sender: ClientId,
    pub kind: MessageKind,
    pub content: Vec<u8>,
}

impl QueuedMessage {
    /// Format: [sender (16)][message id (4, LE)][kind (1)][content size (4, LE)][content]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(QUEUED_MESSAGE_HEADER_SIZE + self.content.len());
        bytes.extend_from_slice(self.sender.as_bytes());
        bytes.extend_from_slice(&self.message_id.to_le_bytes());
        bytes.push(self.kind.as_byte());
        bytes.extend_from_slice(&(self.content.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.content);

        bytes
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Decodes a waiting-messages payload, in payload order.
///
/// A record whose header does not fit ends the list. So does a record whose
/// declared content runs past the end of the payload: it is dropped together
/// with anything after it.
pub fn parse_waiting_messages(payload: &[u8]) -> Vec<QueuedMessage> {
    let mut messages = Vec::new();
    let mut rest = payload;

    while rest.len() >= QUEUED_MESSAGE_HEADER_SIZE {
        let Some(sender) = ClientId::from_slice(rest) else {
            break;
        };
        let message_id = read_u32_le(rest, CLIENT_ID_SIZE);
        let kind = MessageKind::from_byte(rest[CLIENT_ID_SIZE + 4]);
        let content_size = read_u32_le(rest, CLIENT_ID_SIZE + 5) as usize;

        let body = &rest[QUEUED_MESSAGE_HEADER_SIZE..];
        if content_size > body.len() {
            warn!(
                message_id,
                content_size,
                available = body.len(),
                "dropping truncated tail of message queue"
            );
            break;
        }

        messages.push(QueuedMessage {
            message_id,
            sender,
            kind,
            content: body[..content_size].to_vec(),
        });
        rest = &body[content_size..];
    }

    messages
}
