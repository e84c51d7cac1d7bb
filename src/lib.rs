//! A small SMTP client that delivers exactly one message per session over a plain
//! (unencrypted) connection.
//!
//! The protocol core in [`smtp`] is written against the [`ReadWrite`] trait, so it
//! runs the same over a tokio `TcpStream` (see [`connector`]) or over a scripted
//! stream in tests.
//!
//! ```no_run
//! use plain_smtp::{SessionParameters, send_email};
//!
//! # async fn run() {
//! let params = SessionParameters::new("192.0.2.10")
//!     .with_ehlo_domain("example.com")
//!     .with_from("me@example.com")
//!     .with_to("you@example.org")
//!     .with_subject("Hello")
//!     .with_body("Hi there!");
//!
//! // failures are also reported through the events sink, here the silent `()`
//! let _ = send_email(&params, ()).await;
//! # }
//! ```

mod error;
pub use error::*;

pub mod connector;
pub mod events;
pub mod message;
pub mod params;
pub mod smtp;

pub use events::Events;
pub use message::{ContentType, Message};
pub use params::SessionParameters;
pub use smtp::{Response, Session, Stage, send_email, send_email_over};

pub mod integrations {
    pub mod tokio;
}

/// Byte stream the session talks SMTP over.
pub trait ReadWrite {
    type Error: core::error::Error + Send + Sync + 'static;
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Self::Error>>;
    fn write_single(&mut self, buf: &[u8]) -> impl Future<Output = Result<(), Self::Error>>;
    fn write_multi(&mut self, buf: &[&[u8]]) -> impl Future<Output = Result<(), Self::Error>> {
        async move {
            for b in buf {
                self.write_single(b).await?;
            }
            Ok(())
        }
    }
    /// Orderly shutdown of the stream. Called at most once per session.
    fn close(&mut self) -> impl Future<Output = Result<(), Self::Error>>;
}
