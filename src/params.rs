//! Everything one session needs, supplied up front by the caller.

use std::time::Duration;

use crate::{
    Error,
    message::{ContentType, Message},
};

pub const DEFAULT_PORT: u16 = 25;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SessionParameters {
    server: String,
    port: u16,
    timeout: Duration,
    ehlo_domain: String,
    from: String,
    to: String,
    subject: String,
    body: String,
    is_html: bool,
}

impl SessionParameters {
    /// Parameters for a session with `server`, on port 25 with a 10 second
    /// timeout. The EHLO domain defaults to this machine's host name.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            ehlo_domain: local_hostname(),
            from: String::new(),
            to: String::new(),
            subject: String::new(),
            body: String::new(),
            is_html: false,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Bounds the connect attempt and every later read or write.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_ehlo_domain(mut self, domain: impl Into<String>) -> Self {
        self.ehlo_domain = domain.into();
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    #[must_use]
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_html(mut self, is_html: bool) -> Self {
        self.is_html = is_html;
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn ehlo_domain(&self) -> &str {
        &self.ehlo_domain
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_html(&self) -> bool {
        self.is_html
    }

    /// The message sent during the DATA phase.
    pub fn message(&self) -> Message<'_> {
        Message::new(&self.from, &self.to)
            .with_subject(&self.subject)
            .with_body(&self.body)
            .with_content_type(if self.is_html {
                ContentType::Html
            } else {
                ContentType::PlainText
            })
    }

    /// Rejects values that would end up on more than one line of the
    /// conversation. The body is exempt: it is dot-stuffed instead.
    pub fn validate(&self) -> Result<(), Error> {
        check_line("EHLO domain", &self.ehlo_domain)?;
        check_line("sender", &self.from)?;
        check_line("recipient", &self.to)?;
        check_line("subject", &self.subject)
    }
}

/// `value` is sent inside a single command line or header.
pub(crate) fn check_line(field: &'static str, value: &str) -> Result<(), Error> {
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidParameter { field });
    }
    Ok(())
}

fn local_hostname() -> String {
    gethostname::gethostname()
        .to_str()
        .filter(|name| !name.is_empty())
        .unwrap_or("localhost")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let params = SessionParameters::new("mail.example.com");
        assert_eq!(params.server(), "mail.example.com");
        assert_eq!(params.port(), 25);
        assert_eq!(params.timeout(), Duration::from_secs(10));
        assert!(!params.ehlo_domain().is_empty());
        assert!(!params.is_html());
    }

    #[test]
    fn message_follows_html_flag() {
        let params = SessionParameters::new("mx")
            .with_from("a@b.c")
            .with_to("d@e.f")
            .with_subject("hi")
            .with_body("<b>hi</b>");
        assert_eq!(params.message().content_type(), ContentType::PlainText);

        let params = params.with_html(true);
        let message = params.message();
        assert_eq!(message.content_type(), ContentType::Html);
        assert_eq!(message.from(), "a@b.c");
        assert_eq!(message.to(), "d@e.f");
        assert_eq!(message.subject(), "hi");
        assert_eq!(message.body(), "<b>hi</b>");
    }

    #[test]
    fn line_breaks_are_rejected_outside_the_body() {
        let params = SessionParameters::new("mx")
            .with_ehlo_domain("client.example.com")
            .with_from("a@b.c")
            .with_to("d@e.f")
            .with_subject("hi")
            .with_body("line one\r\nline two\n");
        assert!(params.validate().is_ok());

        let cases = [
            (params.clone().with_ehlo_domain("x\r\nRSET"), "EHLO domain"),
            (params.clone().with_from("a@b.c>\r\nRCPT TO:<x@y.z"), "sender"),
            (params.clone().with_to("d@e.f\n"), "recipient"),
            (params.clone().with_subject("hi\rBcc: x@y.z"), "subject"),
        ];
        for (params, expected) in cases {
            match params.validate() {
                Err(Error::InvalidParameter { field }) => assert_eq!(field, expected),
                other => panic!("expected {expected} to be rejected, got {other:?}"),
            }
        }
    }
}
