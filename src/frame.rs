//! Frame codec: fixed 4-byte big-endian integers.
//!
//! Both directions of the protocol use the same frame: the client declares
//! its payload length with one, and the server answers with the printable
//! count in one. Pure transforms; moving the bytes is the I/O layer's job.

/// Size of a frame on the wire.
pub const FRAME_LEN: usize = 4;

/// Encode a u32 in network byte order.
pub fn encode(value: u32) -> [u8; FRAME_LEN] {
    value.to_be_bytes()
}

/// Decode a u32 from network byte order.
pub fn decode(bytes: [u8; FRAME_LEN]) -> u32 {
    u32::from_be_bytes(bytes)
}
