use core::fmt;
use std::time::Duration;

use crate::{
    ConnectionError, Error, Events, ProtocolError, ReadWrite, connector, message::Message,
    params::{SessionParameters, check_line},
};

/// Most a single reply may occupy.
pub const MAX_REPLY_LEN: usize = 4096;

/// A reply from the server, decoded as text.
///
/// Kept verbatim (line endings and continuation lines included); only the first
/// three bytes matter for deciding whether a stage succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    text: String,
}

impl Response {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Response {
            text: String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The numeric status code, if the reply starts with three digits.
    pub fn code(&self) -> Option<u16> {
        let code = self.text.get(..3)?;
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        code.parse().ok()
    }

    /// Literal prefix match, e.g. `has_code("250")`.
    pub fn has_code(&self, code: &str) -> bool {
        self.text.starts_with(code)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.trim())
    }
}

// a reply is complete once a line whose fourth byte is not the '-' continuation
// marker has been terminated. Bare LF is tolerated here.
fn reply_complete(buf: &[u8]) -> bool {
    let mut rest = buf;
    while let Some(end) = rest.iter().position(|&b| b == b'\n') {
        if rest.get(3) != Some(&b'-') || end < 3 {
            return true;
        }
        rest = &rest[end + 1..];
    }
    false
}

/// The steps of a session after the greeting, each gated on a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ehlo,
    MailFrom,
    RcptTo,
    Data,
    /// The message body, sent after `DATA` was accepted.
    Message,
    Quit,
}

impl Stage {
    pub const fn expected_code(&self) -> &'static str {
        match self {
            Stage::Ehlo | Stage::MailFrom | Stage::RcptTo | Stage::Message => "250",
            Stage::Data => "354",
            Stage::Quit => "221",
        }
    }

    fn check(self, response: Response) -> Result<Response, Error> {
        if response.has_code(self.expected_code()) {
            Ok(response)
        } else {
            Err(ProtocolError {
                stage: self,
                response,
            }
            .into())
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Ehlo => "EHLO failed",
            Stage::MailFrom => "MAIL FROM failed",
            Stage::RcptTo => "RCPT TO failed",
            Stage::Data => "DATA command failed",
            Stage::Message => "Message data not accepted",
            Stage::Quit => "QUIT failed",
        })
    }
}

/// One SMTP conversation over one connection.
///
/// The session owns the stream. [`Session::close`] releases it exactly once; if
/// the session is dropped without being closed (say, its future was cancelled)
/// the stream is dropped with it.
pub struct Session<T: ReadWrite, E: Events> {
    // None once closed
    stream: Option<T>,
    events: E,
    timeout: Duration,
    buf: Box<[u8]>,
}

impl<T: ReadWrite, E: Events> Session<T, E> {
    pub fn new(stream: T, timeout: Duration, events: E) -> Self {
        Session {
            stream: Some(stream),
            events,
            timeout,
            buf: vec![0; MAX_REPLY_LEN].into_boxed_slice(),
        }
    }

    /// Wraps `stream` and waits for the `220` greeting. The stream is closed
    /// before returning an error.
    pub async fn establish(stream: T, timeout: Duration, events: E) -> Result<Self, Error> {
        let mut session = Self::new(stream, timeout, events);
        match session.ready().await {
            Ok(_) => Ok(session),
            Err(err) => {
                session.close().await;
                Err(err)
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn write(&mut self, parts: &[&[u8]]) -> Result<(), Error> {
        let stream = self.stream.as_mut().ok_or(ConnectionError::Closed)?;
        tokio::time::timeout(self.timeout, stream.write_multi(parts))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(ConnectionError::lost)?;
        Ok(())
    }

    /// Reads one reply. Stops at the end of the final reply line, at end of
    /// stream, or when [`MAX_REPLY_LEN`] bytes have arrived, whichever is first.
    pub async fn read_response(&mut self) -> Result<Response, Error> {
        let Session {
            stream,
            events,
            timeout,
            buf,
        } = self;
        let stream = stream.as_mut().ok_or(ConnectionError::Closed)?;

        let mut filled = 0;
        tokio::time::timeout(*timeout, async {
            loop {
                let n = stream
                    .read(&mut buf[filled..])
                    .await
                    .map_err(ConnectionError::lost)?;
                filled += n;
                if n == 0 || filled == buf.len() || reply_complete(&buf[..filled]) {
                    return Ok::<(), Error>(());
                }
            }
        })
        .await
        .map_err(|_| Error::Timeout)??;

        let response = Response::from_bytes(&buf[..filled]);
        #[cfg(feature = "log-04")]
        log::debug!("s>{response}");
        events.received(&response);
        Ok(response)
    }

    /// Waits for the server greeting, which must carry `220`.
    pub async fn ready(&mut self) -> Result<Response, Error> {
        let response = match self.read_response().await {
            Err(Error::Timeout) => return Err(ConnectionError::GreetingTimedOut.into()),
            other => other?,
        };
        if !response.has_code("220") {
            return Err(ConnectionError::Greeting { response }.into());
        }
        self.events.connected(&response);
        Ok(response)
    }

    /// Sends `line` followed by `\r\n`, reads one reply and checks it against
    /// the code `stage` expects.
    pub async fn command(&mut self, stage: Stage, line: &str) -> Result<Response, Error> {
        #[cfg(feature = "log-04")]
        log::debug!("c>{line}");
        self.events.sent(line);
        self.write(&[line.as_bytes(), b"\r\n"]).await?;
        let response = self.read_response().await?;
        stage.check(response)
    }

    pub async fn ehlo(&mut self, domain: &str) -> Result<Response, Error> {
        check_line("EHLO domain", domain)?;
        self.command(Stage::Ehlo, &format!("EHLO {domain}")).await
    }

    pub async fn mail_from(&mut self, from: &str) -> Result<Response, Error> {
        check_line("sender", from)?;
        self.command(Stage::MailFrom, &format!("MAIL FROM:<{from}>"))
            .await
    }

    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response, Error> {
        check_line("recipient", to)?;
        self.command(Stage::RcptTo, &format!("RCPT TO:<{to}>")).await
    }

    pub async fn data(&mut self) -> Result<Response, Error> {
        self.command(Stage::Data, "DATA").await
    }

    /// Transmits the composed message (terminator included) as raw data and
    /// waits for the server to accept it.
    pub async fn send_data(&mut self, message: &Message<'_>) -> Result<Response, Error> {
        check_line("sender", message.from())?;
        check_line("recipient", message.to())?;
        check_line("subject", message.subject())?;
        let data = message.to_bytes();
        #[cfg(feature = "log-04")]
        log::debug!("c>[{} bytes of data]<CR><LF>.<CR><LF>", data.len());
        self.events.sent_data(data.len());
        self.write(&[data.as_slice()]).await?;
        let response = self.read_response().await?;
        Stage::Message.check(response)
    }

    pub async fn quit(&mut self) -> Result<Response, Error> {
        self.command(Stage::Quit, "QUIT").await
    }

    /// Runs EHLO through QUIT. Stops at the first reply that does not carry the
    /// expected code; nothing further is sent after that. Parameters containing
    /// line breaks are refused before EHLO goes out.
    ///
    /// Returns the server's reply to the message data.
    pub async fn transact(&mut self, params: &SessionParameters) -> Result<Response, Error> {
        params.validate()?;
        self.ehlo(params.ehlo_domain()).await?;
        self.mail_from(params.from()).await?;
        self.rcpt_to(params.to()).await?;
        self.data().await?;
        let accepted = self.send_data(&params.message()).await?;
        self.events.accepted(&accepted);
        self.quit().await?;
        Ok(accepted)
    }

    /// [`Session::transact`], then close, whatever the outcome.
    pub async fn deliver(mut self, params: &SessionParameters) -> Result<Response, Error> {
        let result = self.transact(params).await;
        self.close().await;
        result
    }

    /// Releases the stream. Calling this again is a no-op.
    pub async fn close(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        self.events.closing();
        let closed = tokio::time::timeout(self.timeout, stream.close()).await;
        #[cfg(feature = "log-04")]
        match closed {
            Ok(Ok(())) => log::debug!("connection closed"),
            Ok(Err(err)) => log::warn!("error while closing connection: {err}"),
            Err(_) => log::warn!("timed out closing connection"),
        }
        #[cfg(not(feature = "log-04"))]
        let _ = closed;
    }
}

/// Delivers one message to `params.server()` over a fresh TCP connection.
///
/// The outcome goes to `events` (exactly one of `completed` or `failed`) and is
/// also returned; on success the value is the server's reply to the message
/// data. The connection is always closed before this returns. Invalid
/// parameters are reported without connecting.
pub async fn send_email<E: Events>(
    params: &SessionParameters,
    mut events: E,
) -> Result<Response, Error> {
    let result: Result<Response, Error> = async {
        params.validate()?;
        connector::connect(
            params.server(),
            params.port(),
            params.timeout(),
            &mut events,
        )
        .await?
        .deliver(params)
        .await
    }
    .await;
    report(result, &mut events)
}

/// Same as [`send_email`] over a stream that is already connected. The greeting
/// is still read and checked.
pub async fn send_email_over<T: ReadWrite, E: Events>(
    stream: T,
    params: &SessionParameters,
    mut events: E,
) -> Result<Response, Error> {
    let result = match params.validate() {
        Ok(()) => match Session::establish(stream, params.timeout(), &mut events).await {
            Ok(session) => session.deliver(params).await,
            Err(err) => Err(err),
        },
        Err(err) => {
            Session::new(stream, params.timeout(), &mut events)
                .close()
                .await;
            Err(err)
        }
    };
    report(result, &mut events)
}

fn report<E: Events>(result: Result<Response, Error>, events: &mut E) -> Result<Response, Error> {
    match &result {
        Ok(_) => events.completed(),
        Err(err) => {
            #[cfg(feature = "log-04")]
            log::error!("{err}");
            events.failed(err);
        }
    }
    result
}
