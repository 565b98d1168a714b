use std::io;

/// Types that can be read back from a frame body, possibly borrowing from it.
///
/// Row payloads borrow from the receiver's buffer, so a decoded message must
/// be consumed before the next frame is received into that buffer.
pub trait Deserialize<'a>: Sized {
    /// # Errors
    /// `io::ErrorKind::InvalidData` if `buf` isn't a valid body for `Self`.
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
