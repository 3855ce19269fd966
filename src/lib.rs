mod error;
pub use error::Error;

mod protocol;
pub use protocol::*;

mod types;
pub use types::*;

mod codec;
pub use codec::*;

mod directory;
pub use directory::*;

mod message_queue;
pub use message_queue::*;

mod key_store;
pub use key_store::*;

mod crypto;
pub use crypto::*;

mod transport;
pub use transport::*;

mod identity;
pub use identity::Identity;

mod config;
pub use config::*;

mod handshake;
pub use handshake::*;
