use crate::{
    CLIENT_ID_SIZE, ClientId, CryptoProvider, Directory, Error, Identity, KeyStore, MessageKind,
    MessageReceipt, PeerRecord, PeerState, PublicKeyResponse, QueuedMessage,
    RESPONSE_HEADER_SIZE, Request, Response, ResponseCode, ResponseHeader, SymmetricKey,
    Transport, parse_waiting_messages,
};
use std::io;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

/// Outcome of processing one queued message.
#[derive(Debug)]
pub enum Incoming {
    /// The sender asks for a symmetric key. Nothing changes locally.
    KeyRequested,
    /// The sender's symmetric key was unwrapped and stored.
    KeyEstablished,
    /// The wrapped key could not be opened with this client's private key,
    /// most likely because it was not encrypted for us. State is unchanged.
    KeyRejected(Error),
    Text(String),
    File(Vec<u8>),
    /// A key is held for the sender but the content did not decrypt with it.
    Undecryptable { ciphertext: Vec<u8>, error: Error },
    /// No key is held for the sender. The content is kept as received.
    NoKey { ciphertext: Vec<u8> },
    /// A message kind this client does not know.
    Unknown { content: Vec<u8> },
}

/// A processed message from the relay queue.
#[derive(Debug)]
pub struct ReceivedMessage {
    pub message_id: u32,
    pub sender: ClientId,
    /// Sender's name in the directory fetched together with the queue.
    pub sender_name: Option<String>,
    pub kind: MessageKind,
    pub incoming: Incoming,
}

/// Drives every exchange with the relay and owns the per-peer key state.
///
/// Each peer is either in [`PeerState::NoKey`] or [`PeerState::KeyEstablished`],
/// derived from the key store:
///
/// - sending a key request never changes state
/// - a received key that decrypts moves the sender to `KeyEstablished`
/// - sending our own key moves the peer to `KeyEstablished` once the relay
///   accepted the message
/// - text and files are only sent in `KeyEstablished`; otherwise the send is
///   refused before the relay is contacted
///
/// Every operation opens a connection, runs its round trips strictly one
/// after another, and disconnects before returning.
pub struct HandshakeOrchestrator<T, C> {
    transport: T,
    crypto: C,
    identity: Option<Identity>,
    key_store: KeyStore,
    directory: Directory,
}

impl<T: Transport, C: CryptoProvider> HandshakeOrchestrator<T, C> {
    pub fn new(transport: T, crypto: C, identity: Option<Identity>) -> Self {
        Self {
            transport,
            crypto,
            identity,
            key_store: KeyStore::new(),
            directory: Directory::default(),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn crypto(&self) -> &C {
        &self.crypto
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.key_store
    }

    /// The directory from the most recent client list.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn peer_state(&self, peer: &ClientId) -> PeerState {
        self.key_store.state(peer)
    }

    /// Registers `username` with the relay and adopts the assigned id.
    ///
    /// A fresh RSA key pair is generated for the registration. The identity
    /// stays unassigned unless the relay answers with a full 16-byte id.
    pub fn register(&mut self, username: &str) -> Result<ClientId, Error> {
        if let Some(identity) = &self.identity {
            return Err(Error::AlreadyRegistered(identity.username.clone()));
        }

        let pair = self.crypto.generate_keypair()?;
        let request = Request::register(username, &pair.public_key);
        let payload =
            self.with_connection(|this| this.round_trip(&request, ResponseCode::RegisterOk))?;

        let id = ClientId::from_slice(&payload).ok_or(Error::TruncatedPayload {
            expected: CLIENT_ID_SIZE,
        })?;
        info!(%id, username, "registered");

        self.identity = Some(Identity {
            username: username.to_string(),
            id,
            private_key: pair.private_key,
            public_key: pair.public_key,
        });
        Ok(id)
    }

    /// Fetches the client directory and keeps it as the latest one.
    pub fn client_list(&mut self) -> Result<&Directory, Error> {
        let id = self.own_id()?;
        self.with_connection(|this| this.refresh_directory(id))?;
        Ok(&self.directory)
    }

    /// Refreshes the directory and returns the first client named `name`.
    pub fn find_peer(&mut self, name: &str) -> Result<PeerRecord, Error> {
        self.client_list()?
            .find_by_name(name)
            .cloned()
            .ok_or_else(|| Error::PeerNotFound(name.to_string()))
    }

    pub fn fetch_public_key(&mut self, peer: ClientId) -> Result<PublicKeyResponse, Error> {
        let id = self.own_id()?;
        self.with_connection(|this| this.lookup_public_key(id, peer))
    }

    /// Asks `peer` to send us a symmetric key. Local state is unchanged.
    pub fn request_symmetric_key(&mut self, peer: ClientId) -> Result<MessageReceipt, Error> {
        let id = self.own_id()?;
        let receipt =
            self.with_connection(|this| this.deliver(id, peer, MessageKind::KeyRequest, &[]))?;
        info!(%peer, "symmetric key requested");
        Ok(receipt)
    }

    /// Generates a symmetric key, sends it to `peer` wrapped with the peer's
    /// public key, and stores it once the relay accepted the message.
    pub fn send_symmetric_key(&mut self, peer: ClientId) -> Result<MessageReceipt, Error> {
        let id = self.own_id()?;
        let (key, receipt) = self.with_connection(|this| {
            let response = this.lookup_public_key(id, peer)?;
            let key = this.crypto.generate_symmetric_key()?;
            let wrapped = this.crypto.rsa_encrypt(&response.public_key, key.as_bytes())?;
            let receipt = this.deliver(id, peer, MessageKind::KeySend, &wrapped)?;
            Ok((key, receipt))
        })?;

        self.key_store.establish(peer, key);
        info!(%peer, "symmetric key sent, channel established");
        Ok(receipt)
    }

    pub fn send_text(&mut self, peer: ClientId, text: &str) -> Result<MessageReceipt, Error> {
        self.send_sealed(peer, MessageKind::Text, text.as_bytes())
    }

    pub fn send_file(&mut self, peer: ClientId, contents: &[u8]) -> Result<MessageReceipt, Error> {
        self.send_sealed(peer, MessageKind::File, contents)
    }

    /// Pulls the waiting messages and processes each one in queue order.
    ///
    /// The directory is refreshed first so senders can be named. A message
    /// that fails to decrypt is reported in its own [`ReceivedMessage`] and
    /// does not stop the rest of the queue.
    pub fn fetch_waiting_messages(&mut self) -> Result<Vec<ReceivedMessage>, Error> {
        let id = self.own_id()?;
        let queued = self.with_connection(|this| {
            this.refresh_directory(id)?;
            let payload = this.round_trip(
                &Request::waiting_messages(id),
                ResponseCode::WaitingMessages,
            )?;
            Ok(parse_waiting_messages(&payload))
        })?;
        info!(count = queued.len(), "fetched waiting messages");

        Ok(queued
            .into_iter()
            .map(|message| self.process_message(message))
            .collect())
    }

    /// Applies one queued message to the key state and opens its content.
    pub fn process_message(&mut self, message: QueuedMessage) -> ReceivedMessage {
        let QueuedMessage {
            message_id,
            sender,
            kind,
            content,
        } = message;

        let incoming = match kind {
            MessageKind::KeyRequest => Incoming::KeyRequested,
            MessageKind::KeySend => match self.unwrap_symmetric_key(&content) {
                Ok(key) => {
                    self.key_store.establish(sender, key);
                    info!(%sender, "received symmetric key, channel established");
                    Incoming::KeyEstablished
                }
                Err(error) => {
                    warn!(%sender, %error, "symmetric key was not intended for this client");
                    Incoming::KeyRejected(error)
                }
            },
            // Empty text carries no ciphertext to decrypt.
            MessageKind::Text if content.is_empty() && self.key_store.has(&sender) => {
                Incoming::Text(String::new())
            }
            MessageKind::Text => match self.open(&sender, content) {
                Ok(plaintext) => Incoming::Text(String::from_utf8_lossy(&plaintext).into_owned()),
                Err(incoming) => incoming,
            },
            MessageKind::File => match self.open(&sender, content) {
                Ok(plaintext) => Incoming::File(plaintext),
                Err(incoming) => incoming,
            },
            MessageKind::Unknown(byte) => {
                debug!(%sender, kind = byte, "unknown message kind");
                Incoming::Unknown { content }
            }
        };

        ReceivedMessage {
            message_id,
            sender,
            sender_name: self.directory.name_of(&sender).map(str::to_string),
            kind,
            incoming,
        }
    }

    fn own_id(&self) -> Result<ClientId, Error> {
        self.identity
            .as_ref()
            .map(|identity| identity.id)
            .ok_or(Error::NotRegistered)
    }

    fn send_sealed(
        &mut self,
        peer: ClientId,
        kind: MessageKind,
        plaintext: &[u8],
    ) -> Result<MessageReceipt, Error> {
        let id = self.own_id()?;
        let Some(key) = self.key_store.lookup(&peer) else {
            return Err(Error::ChannelNotEstablished(peer));
        };
        let ciphertext = self.crypto.aes_encrypt(key, plaintext);

        let receipt = self.with_connection(|this| this.deliver(id, peer, kind, &ciphertext))?;
        info!(%peer, ?kind, size = ciphertext.len(), "sent encrypted content");
        Ok(receipt)
    }

    fn unwrap_symmetric_key(&self, wrapped: &[u8]) -> Result<SymmetricKey, Error> {
        let identity = self.identity.as_ref().ok_or(Error::NotRegistered)?;
        let mut decrypted = self.crypto.rsa_decrypt(&identity.private_key, wrapped)?;
        let key = SymmetricKey::try_from(decrypted.as_slice())
            .map_err(|e| Error::Decryption(e.to_string()));
        decrypted.zeroize();
        key
    }

    /// Decrypts content from `sender`, or explains why it stays sealed.
    fn open(&self, sender: &ClientId, content: Vec<u8>) -> Result<Vec<u8>, Incoming> {
        let Some(key) = self.key_store.lookup(sender) else {
            return Err(Incoming::NoKey {
                ciphertext: content,
            });
        };

        self.crypto.aes_decrypt(key, &content).map_err(|error| {
            warn!(%sender, %error, "could not decrypt message");
            Incoming::Undecryptable {
                ciphertext: content,
                error,
            }
        })
    }

    fn with_connection<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, Error>,
    ) -> Result<R, Error> {
        self.transport.connect()?;
        let result = f(self);
        self.transport.disconnect();

        if let Err(error) = &result {
            if error.is_connection_fatal() {
                warn!(%error, "request failed, connection dropped");
            }
        }
        result
    }

    fn refresh_directory(&mut self, id: ClientId) -> Result<(), Error> {
        let payload = self.round_trip(&Request::client_list(id), ResponseCode::ClientList)?;
        self.directory = Directory::from_payload(&payload);
        debug!(peers = self.directory.len(), "directory refreshed");
        Ok(())
    }

    fn lookup_public_key(
        &mut self,
        id: ClientId,
        peer: ClientId,
    ) -> Result<PublicKeyResponse, Error> {
        let payload = self.round_trip(&Request::public_key(id, peer), ResponseCode::PublicKey)?;
        let response = PublicKeyResponse::from_bytes(&payload)?;
        if response.client_id != peer {
            warn!(%peer, returned = %response.client_id, "public key response names another client");
        }
        Ok(response)
    }

    fn deliver(
        &mut self,
        id: ClientId,
        peer: ClientId,
        kind: MessageKind,
        content: &[u8],
    ) -> Result<MessageReceipt, Error> {
        let request = Request::send_message(id, peer, kind, content)?;
        let payload = self.round_trip(&request, ResponseCode::MessageSent)?;
        MessageReceipt::from_bytes(&payload)
    }

    fn round_trip(&mut self, request: &Request, expected: ResponseCode) -> Result<Vec<u8>, Error> {
        debug!(code = ?request.code(), size = request.payload().len(), "sending request");
        self.transport.send_all(&request.to_bytes())?;

        let response = self.read_response()?;
        debug!(
            code = response.header.code,
            size = response.payload.len(),
            "received response"
        );
        response.into_payload(expected)
    }

    fn read_response(&mut self) -> Result<Response, Error> {
        let header = self
            .transport
            .recv_exact(RESPONSE_HEADER_SIZE)
            .map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => Error::Framing(
                    "connection closed before the response header was complete".to_string(),
                ),
                _ => Error::Transport(e),
            })?;
        let header = ResponseHeader::from_bytes(&header)?;

        let expected = header.payload_size as usize;
        let payload = if expected == 0 {
            Vec::new()
        } else {
            self.transport
                .recv_exact(expected)
                .map_err(|e| match e.kind() {
                    io::ErrorKind::UnexpectedEof => Error::TruncatedPayload { expected },
                    _ => Error::Transport(e),
                })?
        };
        if payload.len() != expected {
            return Err(Error::TruncatedPayload { expected });
        }

        Ok(Response { header, payload })
    }
}
