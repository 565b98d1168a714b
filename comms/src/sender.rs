use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LEN_TYPE_SIZE, Serialize, encode_len};

/// The sending end of a link.
///
/// Owned message parts are staged in a reused buffer behind the length
/// header, borrowed row data goes to the writer as is.
pub struct OnoSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    staging: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            staging: Vec::new(),
        }
    }

    /// Writes `msg` as a single frame and flushes it.
    ///
    /// # Errors
    /// Any write failure of the underlying link.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        let Self { staging, tx } = self;

        staging.clear();
        staging.resize(LEN_TYPE_SIZE, 0);

        let rows = msg.serialize(staging).unwrap_or_default();
        let body_len = staging.len() - LEN_TYPE_SIZE + rows.len();
        staging[..LEN_TYPE_SIZE].copy_from_slice(&encode_len(body_len)?);

        tx.write_all(staging).await?;
        if !rows.is_empty() {
            tx.write_all(rows).await?;
        }

        tx.flush().await
    }
}
