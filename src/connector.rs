//! Opening the TCP connection a session runs over.

use std::{io, time::Duration};

use tokio::net::TcpStream;

use crate::{ConnectionError, Error, Events, ReadWrite, Session, integrations::tokio::TokioIo};

/// Connects to `address:port` and waits for the `220` greeting.
///
/// Name resolution happens here and counts against `timeout`, as does the
/// greeting. Every failure on the way comes back as
/// [`Error::Connection`](crate::Error::Connection).
pub async fn connect<E: Events>(
    address: &str,
    port: u16,
    timeout: Duration,
    events: E,
) -> Result<Session<TokioIo<TcpStream>, E>, Error> {
    let open = async { TcpStream::connect((address, port)).await.map(TokioIo) };
    connect_with(address, port, timeout, open, events).await
}

pub(crate) async fn connect_with<T, F, E>(
    address: &str,
    port: u16,
    timeout: Duration,
    open: F,
    mut events: E,
) -> Result<Session<T, E>, Error>
where
    T: ReadWrite,
    F: Future<Output = io::Result<T>>,
    E: Events,
{
    #[cfg(feature = "log-04")]
    log::debug!("connecting to {address}:{port}");
    events.connecting(address, port);

    let stream = match tokio::time::timeout(timeout, open).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(ConnectionError::Refused {
                address: format!("{address}:{port}"),
                source,
            }
            .into());
        }
        Err(_) => {
            return Err(ConnectionError::TimedOut {
                address: format!("{address}:{port}"),
            }
            .into());
        }
    };

    Session::establish(stream, timeout, events)
        .await
        .map_err(|err| match err {
            Error::Connection(ConnectionError::GreetingTimedOut) => ConnectionError::TimedOut {
                address: format!("{address}:{port}"),
            }
            .into(),
            err => err,
        })
}
