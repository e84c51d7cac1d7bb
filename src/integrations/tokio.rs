use core::ops::{Deref, DerefMut};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ReadWrite;

/// Adapts a tokio stream, typically a `TcpStream`, to [`ReadWrite`].
pub struct TokioIo<T: AsyncRead + AsyncWrite + Unpin>(pub T);

impl<T: AsyncRead + AsyncWrite + Unpin> Deref for TokioIo<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> DerefMut for TokioIo<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> ReadWrite for TokioIo<T> {
    type Error = tokio::io::Error;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.read(buf).await
    }

    async fn write_single(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        if buf.is_empty() {
            return Ok(());
        }
        self.0.write_all(buf).await
    }

    async fn write_multi(&mut self, buf: &[&[u8]]) -> Result<(), Self::Error> {
        for b in buf {
            self.write_single(b).await?;
        }
        self.0.flush().await
    }

    // the descriptor itself is released when the stream is dropped
    async fn close(&mut self) -> Result<(), Self::Error> {
        self.0.shutdown().await
    }
}
