mod client_id;
pub use client_id::*;

mod keys;
pub use keys::*;
