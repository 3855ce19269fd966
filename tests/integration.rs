#[cfg(test)]
mod integration_tests {
    use messageu::{
        CLIENT_ID_SIZE, ClientId, Error, HandshakeOrchestrator, Incoming, MessageKind,
        PUBLIC_KEY_SIZE, PeerRecord, PeerState, PublicKey, QueuedMessage, REQUEST_HEADER_SIZE,
        RequestCode, RequestHeader, ResponseCode, ResponseHeader, RustCryptoProvider, Transport,
        USERNAME_SIZE, VERSION,
    };
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::io;
    use std::rc::Rc;

    struct Registered {
        id: ClientId,
        name: String,
        public_key: PublicKey,
    }

    /// Minimal in-memory relay speaking the wire protocol.
    #[derive(Default)]
    struct Relay {
        clients: Vec<Registered>,
        queues: HashMap<ClientId, Vec<QueuedMessage>>,
        next_message_id: u32,
        requests: usize,
        short_register_reply: bool,
    }

    impl Relay {
        fn handle(&mut self, request: &[u8]) -> Vec<u8> {
            self.requests += 1;
            let header = RequestHeader::from_bytes(request).unwrap();
            let payload = &request[REQUEST_HEADER_SIZE..];
            assert_eq!(header.version, VERSION);
            assert_eq!(payload.len(), header.payload_size as usize);

            match RequestCode::from_u16(header.code).unwrap() {
                RequestCode::Register => self.register(payload),
                RequestCode::ClientList => {
                    let records: Vec<u8> = self
                        .clients
                        .iter()
                        .filter(|client| client.id != header.client_id)
                        .flat_map(|client| {
                            PeerRecord {
                                id: client.id,
                                name: client.name.clone(),
                            }
                            .to_bytes()
                        })
                        .collect();
                    response(ResponseCode::ClientList, &records)
                }
                RequestCode::PublicKey => {
                    let target = ClientId::from_slice(payload).unwrap();
                    match self.clients.iter().find(|client| client.id == target) {
                        Some(client) => {
                            let mut body = client.id.as_bytes().to_vec();
                            body.extend_from_slice(client.public_key.as_bytes());
                            response(ResponseCode::PublicKey, &body)
                        }
                        None => response(ResponseCode::GeneralError, &[]),
                    }
                }
                RequestCode::SendMessage => {
                    let target = ClientId::from_slice(payload).unwrap();
                    let kind = MessageKind::from_byte(payload[16]);
                    let content = payload[21..].to_vec();

                    self.next_message_id += 1;
                    self.queues.entry(target).or_default().push(QueuedMessage {
                        message_id: self.next_message_id,
                        sender: header.client_id,
                        kind,
                        content,
                    });

                    let mut body = target.as_bytes().to_vec();
                    body.extend_from_slice(&self.next_message_id.to_le_bytes());
                    response(ResponseCode::MessageSent, &body)
                }
                RequestCode::WaitingMessages => {
                    let queued = self.queues.remove(&header.client_id).unwrap_or_default();
                    let body: Vec<u8> = queued.iter().flat_map(QueuedMessage::to_bytes).collect();
                    response(ResponseCode::WaitingMessages, &body)
                }
            }
        }

        fn register(&mut self, payload: &[u8]) -> Vec<u8> {
            let field = &payload[..USERNAME_SIZE];
            let end = field.iter().position(|&b| b == 0).unwrap();
            let name = String::from_utf8(field[..end].to_vec()).unwrap();

            if self.clients.iter().any(|client| client.name == name) {
                return response(ResponseCode::GeneralError, &[]);
            }
            if self.short_register_reply {
                return response(ResponseCode::RegisterOk, &[0x11; 10]);
            }

            let id = ClientId::from([self.clients.len() as u8 + 1; CLIENT_ID_SIZE]);
            let public_key = PublicKey::try_from(&payload[USERNAME_SIZE..]).unwrap();
            self.clients.push(Registered {
                id,
                name,
                public_key,
            });
            response(ResponseCode::RegisterOk, id.as_bytes())
        }
    }

    fn response(code: ResponseCode, payload: &[u8]) -> Vec<u8> {
        let header = ResponseHeader {
            version: VERSION,
            code: code.as_u16(),
            payload_size: payload.len() as u32,
        };
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    /// One client's view of the shared relay.
    struct RelayConnection {
        relay: Rc<RefCell<Relay>>,
        inbound: VecDeque<u8>,
        connected: bool,
    }

    impl Transport for RelayConnection {
        fn connect(&mut self) -> io::Result<()> {
            self.connected = true;
            Ok(())
        }

        fn send_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            if !self.connected {
                return Err(io::ErrorKind::NotConnected.into());
            }
            let reply = self.relay.borrow_mut().handle(bytes);
            self.inbound.extend(reply);
            Ok(())
        }

        fn recv_exact(&mut self, len: usize) -> io::Result<Vec<u8>> {
            if self.inbound.len() < len {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            Ok(self.inbound.drain(..len).collect())
        }

        fn disconnect(&mut self) {
            self.connected = false;
            self.inbound.clear();
        }
    }

    type Client = HandshakeOrchestrator<RelayConnection, RustCryptoProvider>;

    fn client(relay: &Rc<RefCell<Relay>>) -> Client {
        let connection = RelayConnection {
            relay: Rc::clone(relay),
            inbound: VecDeque::new(),
            connected: false,
        };
        HandshakeOrchestrator::new(connection, RustCryptoProvider::new(), None)
    }

    #[test]
    fn test_full_exchange_between_two_clients() {
        let relay = Rc::new(RefCell::new(Relay::default()));
        let mut alice = client(&relay);
        let mut bob = client(&relay);

        let alice_id = alice.register("alice").unwrap();
        let bob_id = bob.register("bob").unwrap();
        assert_ne!(alice_id, bob_id);

        let peer = alice.find_peer("bob").unwrap();
        assert_eq!(peer.id, bob_id);

        let public_key = alice.fetch_public_key(bob_id).unwrap();
        assert_eq!(public_key.client_id, bob_id);
        assert_eq!(&public_key.public_key, &bob.identity().unwrap().public_key);

        // No key yet: refused without reaching the relay.
        let before = relay.borrow().requests;
        assert!(matches!(
            alice.send_text(bob_id, "too early"),
            Err(Error::ChannelNotEstablished(_))
        ));
        assert_eq!(relay.borrow().requests, before);

        alice.request_symmetric_key(bob_id).unwrap();
        assert_eq!(alice.peer_state(&bob_id), PeerState::NoKey);

        let received = bob.fetch_waiting_messages().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].kind, MessageKind::KeyRequest);
        assert_eq!(received[0].sender_name.as_deref(), Some("alice"));
        assert!(matches!(received[0].incoming, Incoming::KeyRequested));

        bob.send_symmetric_key(alice_id).unwrap();
        assert_eq!(bob.peer_state(&alice_id), PeerState::KeyEstablished);

        let received = alice.fetch_waiting_messages().unwrap();
        assert_eq!(received.len(), 1);
        assert!(matches!(received[0].incoming, Incoming::KeyEstablished));
        assert_eq!(alice.peer_state(&bob_id), PeerState::KeyEstablished);
        assert_eq!(
            alice.key_store().lookup(&bob_id),
            bob.key_store().lookup(&alice_id)
        );

        alice.send_text(bob_id, "Hello Bob").unwrap();
        let received = bob.fetch_waiting_messages().unwrap();
        assert!(matches!(&received[0].incoming, Incoming::Text(text) if text == "Hello Bob"));

        let file: Vec<u8> = (0..=255).collect();
        bob.send_file(alice_id, &file).unwrap();
        let received = alice.fetch_waiting_messages().unwrap();
        assert!(matches!(&received[0].incoming, Incoming::File(bytes) if bytes == &file));

        assert!(alice.fetch_waiting_messages().unwrap().is_empty());
    }

    #[test]
    fn test_key_for_someone_else_is_rejected() {
        let relay = Rc::new(RefCell::new(Relay::default()));
        let mut alice = client(&relay);
        let mut bob = client(&relay);
        let mut carol = client(&relay);

        let alice_id = alice.register("alice").unwrap();
        bob.register("bob").unwrap();
        let carol_id = carol.register("carol").unwrap();

        bob.send_symmetric_key(alice_id).unwrap();
        let misrouted = relay.borrow_mut().queues.remove(&alice_id).unwrap();
        relay.borrow_mut().queues.insert(carol_id, misrouted);

        let received = carol.fetch_waiting_messages().unwrap();
        assert_eq!(received.len(), 1);
        assert!(matches!(
            received[0].incoming,
            Incoming::KeyRejected(Error::Decryption(_))
        ));
        assert_eq!(carol.peer_state(&received[0].sender), PeerState::NoKey);
    }

    #[test]
    fn test_text_without_key_arrives_sealed() {
        let relay = Rc::new(RefCell::new(Relay::default()));
        let mut alice = client(&relay);
        let mut bob = client(&relay);

        let alice_id = alice.register("alice").unwrap();
        let bob_id = bob.register("bob").unwrap();

        alice.send_symmetric_key(bob_id).unwrap();
        alice.send_text(bob_id, "secret").unwrap();

        // Bob loses the key message and only sees the text.
        relay.borrow_mut().queues.get_mut(&bob_id).unwrap().remove(0);

        let received = bob.fetch_waiting_messages().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].sender, alice_id);
        assert!(matches!(
            &received[0].incoming,
            Incoming::NoKey { ciphertext } if ciphertext.len() == 16
        ));
    }

    #[test]
    fn test_malformed_registration_reply() {
        let relay = Rc::new(RefCell::new(Relay {
            short_register_reply: true,
            ..Relay::default()
        }));
        let mut alice = client(&relay);

        assert!(matches!(
            alice.register("alice"),
            Err(Error::TruncatedPayload { expected: 16 })
        ));
        assert!(alice.identity().is_none());
        assert!(matches!(alice.client_list(), Err(Error::NotRegistered)));
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let relay = Rc::new(RefCell::new(Relay::default()));
        let mut first = client(&relay);
        let mut second = client(&relay);

        first.register("alice").unwrap();
        let err = second.register("alice").unwrap_err();
        assert!(matches!(err, Error::ServerRejected));
        assert!(err.is_connection_fatal());
        assert!(second.identity().is_none());

        assert!(matches!(
            first.find_peer("nobody"),
            Err(Error::PeerNotFound(_))
        ));
    }

    #[test]
    fn test_public_key_wire_size() {
        let relay = Rc::new(RefCell::new(Relay::default()));
        let mut alice = client(&relay);
        alice.register("alice").unwrap();

        let public_key = &relay.borrow().clients[0].public_key;
        assert_eq!(public_key.as_bytes().len(), PUBLIC_KEY_SIZE);
        assert_eq!(public_key.as_bytes()[0], 0x30);
    }
}
