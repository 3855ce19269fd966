#[macro_use]
extern crate afl;
use messageu::{Directory, MessageReceipt, PublicKeyResponse, ResponseHeader};

fn main() {
    fuzz!(|data: &[u8]| {
        if let Ok(header) = ResponseHeader::from_bytes(data) {
            let _ = header.response_code();
        }
        let _ = Directory::from_payload(data);
        let _ = PublicKeyResponse::from_bytes(data);
        let _ = MessageReceipt::from_bytes(data);
    });
}
