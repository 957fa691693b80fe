//! Running XOR checksum stored in the last byte of every directory frame.

use crate::layout::FRAME_SIZE;

/// XOR of every byte in `bytes`.
pub fn compute(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, byte| acc ^ byte)
}

/// True when the last byte of `frame` equals the XOR of the preceding 127.
pub fn verify(frame: &[u8; FRAME_SIZE]) -> bool {
    compute(&frame[..FRAME_SIZE - 1]) == frame[FRAME_SIZE - 1]
}

pub fn fix(frame: &mut [u8; FRAME_SIZE]) {
    frame[FRAME_SIZE - 1] = compute(&frame[..FRAME_SIZE - 1]);
}
