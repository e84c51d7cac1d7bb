//! The message transmitted after `DATA`: a fixed header block, a blank line,
//! the body and the end-of-data terminator.

use core::fmt;

/// End-of-data marker, RFC 5321 §4.1.1.4.
pub const DATA_TERMINATOR: &str = "\r\n.\r\n";

/// Body type announced in the `Content-Type` header. Both are sent as UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    PlainText,
    Html,
}

impl ContentType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ContentType::PlainText => "text/plain; charset=\"utf-8\"",
            ContentType::Html => "text/html; charset=\"utf-8\"",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Message
// ═══════════════════════════════════════════════════════════════════════════

/// A single-part message ready for the DATA phase.
///
/// Header values are written as given; addresses are not validated here, the
/// server is the judge of those.
#[derive(Debug, Clone)]
pub struct Message<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
    content_type: ContentType,
}

impl<'a> Message<'a> {
    #[must_use]
    pub const fn new(from: &'a str, to: &'a str) -> Self {
        Self {
            from,
            to,
            subject: "",
            body: "",
            content_type: ContentType::PlainText,
        }
    }

    #[must_use]
    pub const fn with_subject(mut self, subject: &'a str) -> Self {
        self.subject = subject;
        self
    }

    #[must_use]
    pub const fn with_body(mut self, body: &'a str) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub const fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    #[must_use]
    pub const fn from(&self) -> &'a str {
        self.from
    }

    #[must_use]
    pub const fn to(&self) -> &'a str {
        self.to
    }

    #[must_use]
    pub const fn subject(&self) -> &'a str {
        self.subject
    }

    #[must_use]
    pub const fn body(&self) -> &'a str {
        self.body
    }

    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// The exact bytes sent after the server's `354`, terminator included.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "From: {}\r\n", self.from)?;
        write!(f, "To: {}\r\n", self.to)?;
        write!(f, "Subject: {}\r\n", self.subject)?;
        f.write_str("MIME-Version: 1.0\r\n")?;
        write!(f, "Content-Type: {}\r\n", self.content_type)?;
        f.write_str("\r\n")?;

        // Dot-stuffing (RFC 5321 §4.5.2): a line starting with '.' gets an extra
        // '.' so the server does not read it as the end of data. Any LF starts a
        // new line, since some servers accept a bare LF as a line ending.
        for (i, line) in self.body.split('\n').enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            if line.starts_with('.') {
                f.write_str(".")?;
            }
            f.write_str(line)?;
        }

        f.write_str(DATA_TERMINATOR)
    }
}
