#[macro_use]
extern crate afl;
use messageu::parse_waiting_messages;

fn main() {
    fuzz!(|data: &[u8]| {
        let _ = parse_waiting_messages(data);
    });
}
