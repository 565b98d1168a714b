//! Point to point framing between pipeline participants.
//!
//! Every frame is a big endian `u64` body length followed by the body. Bodies
//! are produced by `Serialize` and read back by `Deserialize`, see `msg` for
//! the application layer.

mod deserialize;
pub mod msg;
mod receiver;
mod sender;
mod serialize;
pub mod specs;

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

pub use deserialize::Deserialize;
pub use receiver::OnoReceiver;
pub use sender::OnoSender;
pub use serialize::Serialize;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// Splits a link to another participant into its receiving and sending ends.
///
/// # Arguments
/// * `rx` - The readable half of the link.
/// * `tx` - The writable half of the link.
pub fn channel<R, W>(rx: R, tx: W) -> (OnoReceiver<R>, OnoSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (OnoReceiver::new(rx), OnoSender::new(tx))
}

fn encode_len(len: usize) -> io::Result<[u8; LEN_TYPE_SIZE]> {
    let len = LenType::try_from(len).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    Ok(len.to_be_bytes())
}

fn decode_len(header: [u8; LEN_TYPE_SIZE]) -> io::Result<usize> {
    usize::try_from(LenType::from_be_bytes(header))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_are_big_endian() {
        assert_eq!(encode_len(0x0102).unwrap(), [0, 0, 0, 0, 0, 0, 1, 2]);
        assert_eq!(decode_len([0, 0, 0, 0, 0, 0, 1, 2]).unwrap(), 0x0102);
    }
}
