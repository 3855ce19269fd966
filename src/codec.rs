use crate::{
    CLIENT_ID_SIZE, ClientId, Error, MessageKind, PUBLIC_KEY_SIZE, PublicKey,
    REQUEST_HEADER_SIZE, RESPONSE_HEADER_SIZE, RequestCode, ResponseCode, USERNAME_SIZE,
    VERSION,
};

/// Fixed 23-byte prefix of every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestHeader {
    pub client_id: ClientId,
    pub version: u8,
    pub code: u16,
    pub payload_size: u32,
}

impl RequestHeader {
    /// Format: [client id (16)][version (1)][code (2, LE)][payload size (4, LE)]
    pub fn to_bytes(&self) -> [u8; REQUEST_HEADER_SIZE] {
        let mut bytes = [0u8; REQUEST_HEADER_SIZE];
        bytes[0..16].copy_from_slice(self.client_id.as_bytes());
        bytes[16] = self.version;
        bytes[17..19].copy_from_slice(&self.code.to_le_bytes());
        bytes[19..23].copy_from_slice(&self.payload_size.to_le_bytes());

        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < REQUEST_HEADER_SIZE {
            return Err(Error::Framing(format!(
                "request header needs {REQUEST_HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let client_id = ClientId::from_slice(&bytes[0..16])
            .ok_or_else(|| Error::Framing("Invalid client id".to_string()))?;

        Ok(Self {
            client_id,
            version: bytes[16],
            code: u16::from_le_bytes([bytes[17], bytes[18]]),
            payload_size: u32::from_le_bytes([bytes[19], bytes[20], bytes[21], bytes[22]]),
        })
    }
}

/// Fixed 7-byte prefix of every response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseHeader {
    pub version: u8,
    pub code: u16,
    pub payload_size: u32,
}

impl ResponseHeader {
    /// Format: [version (1)][code (2, LE)][payload size (4, LE)]
    pub fn to_bytes(&self) -> [u8; RESPONSE_HEADER_SIZE] {
        let mut bytes = [0u8; RESPONSE_HEADER_SIZE];
        bytes[0] = self.version;
        bytes[1..3].copy_from_slice(&self.code.to_le_bytes());
        bytes[3..7].copy_from_slice(&self.payload_size.to_le_bytes());

        bytes
    }

    /// Parses the header. Does not touch the payload, which the caller reads
    /// separately using `payload_size`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < RESPONSE_HEADER_SIZE {
            return Err(Error::Framing(format!(
                "response header needs {RESPONSE_HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        Ok(Self {
            version: bytes[0],
            code: u16::from_le_bytes([bytes[1], bytes[2]]),
            payload_size: u32::from_le_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]),
        })
    }

    pub fn response_code(&self) -> Option<ResponseCode> {
        ResponseCode::from_u16(self.code)
    }
}

/// A complete request, header plus payload.
///
/// Only the builders below can create one, so the declared payload size always
/// matches the payload that follows it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    client_id: ClientId,
    code: RequestCode,
    payload: Vec<u8>,
    payload_size: u32,
}

impl Request {
    fn new(client_id: ClientId, code: RequestCode, payload: Vec<u8>) -> Result<Self, Error> {
        let payload_size =
            u32::try_from(payload.len()).map_err(|_| Error::PayloadTooLarge(payload.len()))?;

        Ok(Self {
            client_id,
            code,
            payload,
            payload_size,
        })
    }

    fn empty(client_id: ClientId, code: RequestCode) -> Self {
        Self {
            client_id,
            code,
            payload: Vec::new(),
            payload_size: 0,
        }
    }

    /// Registration request. Sent with the all-zero id since none is assigned yet.
    ///
    /// The username is cut to 254 bytes so the 255-byte field always keeps a
    /// terminating zero.
    pub fn register(username: &str, public_key: &PublicKey) -> Self {
        let mut payload = vec![0u8; USERNAME_SIZE + PUBLIC_KEY_SIZE];
        let name = username.as_bytes();
        let len = name.len().min(USERNAME_SIZE - 1);
        payload[..len].copy_from_slice(&name[..len]);
        payload[USERNAME_SIZE..].copy_from_slice(public_key.as_bytes());

        Self {
            client_id: ClientId::UNASSIGNED,
            code: RequestCode::Register,
            payload,
            payload_size: (USERNAME_SIZE + PUBLIC_KEY_SIZE) as u32,
        }
    }

    pub fn client_list(client_id: ClientId) -> Self {
        Self::empty(client_id, RequestCode::ClientList)
    }

    pub fn public_key(client_id: ClientId, target: ClientId) -> Self {
        Self {
            client_id,
            code: RequestCode::PublicKey,
            payload: target.as_bytes().to_vec(),
            payload_size: CLIENT_ID_SIZE as u32,
        }
    }

    pub fn waiting_messages(client_id: ClientId) -> Self {
        Self::empty(client_id, RequestCode::WaitingMessages)
    }

    /// Format: [target id (16)][kind (1)][content size (4, LE)][content]
    pub fn send_message(
        client_id: ClientId,
        target: ClientId,
        kind: MessageKind,
        content: &[u8],
    ) -> Result<Self, Error> {
        let content_size =
            u32::try_from(content.len()).map_err(|_| Error::PayloadTooLarge(content.len()))?;

        let mut payload = Vec::with_capacity(CLIENT_ID_SIZE + 1 + 4 + content.len());
        payload.extend_from_slice(target.as_bytes());
        payload.push(kind.as_byte());
        payload.extend_from_slice(&content_size.to_le_bytes());
        payload.extend_from_slice(content);

        Self::new(client_id, RequestCode::SendMessage, payload)
    }

    pub fn code(&self) -> RequestCode {
        self.code
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn header(&self) -> RequestHeader {
        RequestHeader {
            client_id: self.client_id,
            version: VERSION,
            code: self.code.as_u16(),
            payload_size: self.payload_size,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(REQUEST_HEADER_SIZE + self.payload.len());
        bytes.extend_from_slice(&self.header().to_bytes());
        bytes.extend_from_slice(&self.payload);

        bytes
    }
}

/// A response header together with its fully read payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub header: ResponseHeader,
    pub payload: Vec<u8>,
}

impl Response {
    /// Returns the payload if the response carries `expected`.
    ///
    /// The general error code is reported as `ServerRejected` before the
    /// payload is looked at.
    pub fn into_payload(self, expected: ResponseCode) -> Result<Vec<u8>, Error> {
        match self.header.response_code() {
            Some(ResponseCode::GeneralError) => Err(Error::ServerRejected),
            Some(code) if code == expected => Ok(self.payload),
            _ => Err(Error::UnexpectedResponse {
                expected: expected.as_u16(),
                actual: self.header.code,
            }),
        }
    }
}

/// Payload of a public key response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyResponse {
    pub client_id: ClientId,
    pub public_key: PublicKey,
}

impl PublicKeyResponse {
    /// Format: [client id (16)][public key (160)]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        const SIZE: usize = CLIENT_ID_SIZE + PUBLIC_KEY_SIZE;
        if bytes.len() < SIZE {
            return Err(Error::TruncatedPayload { expected: SIZE });
        }

        let client_id =
            ClientId::from_slice(bytes).ok_or(Error::TruncatedPayload { expected: SIZE })?;
        let public_key = PublicKey::try_from(&bytes[CLIENT_ID_SIZE..SIZE])?;

        Ok(Self {
            client_id,
            public_key,
        })
    }
}

/// Payload of a message-sent response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageReceipt {
    pub recipient: ClientId,
    pub message_id: u32,
}

impl MessageReceipt {
    /// Format: [recipient id (16)][message id (4, LE)]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        const SIZE: usize = CLIENT_ID_SIZE + 4;
        if bytes.len() < SIZE {
            return Err(Error::TruncatedPayload { expected: SIZE });
        }

        let recipient =
            ClientId::from_slice(bytes).ok_or(Error::TruncatedPayload { expected: SIZE })?;
        let message_id = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);

        Ok(Self {
            recipient,
            message_id,
        })
    }
}
