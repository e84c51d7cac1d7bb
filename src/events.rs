//! Observer hooks for a session.
//!
//! The engine never prints. Everything a user might want to see (commands going
//! out, replies coming in, the final outcome) is handed to an [`Events`] sink.
//! All methods default to doing nothing, so a sink only implements what it shows.

use crate::{Error, smtp::Response};

pub trait Events {
    /// About to open the transport to `address:port`.
    fn connecting(&mut self, _address: &str, _port: u16) {}

    /// The server greeted with `220`.
    fn connected(&mut self, _greeting: &Response) {}

    /// A command line went out, without its trailing `\r\n`.
    fn sent(&mut self, _command: &str) {}

    /// The composed message went out, `len` bytes including the terminator.
    fn sent_data(&mut self, _len: usize) {}

    fn received(&mut self, _response: &Response) {}

    /// The server accepted the message data for delivery.
    fn accepted(&mut self, _response: &Response) {}

    /// The connection is being released. Fires at most once per session.
    fn closing(&mut self) {}

    /// The whole exchange, including QUIT, succeeded.
    fn completed(&mut self) {}

    fn failed(&mut self, _error: &Error) {}
}

/// Discards every event.
impl Events for () {}

impl<E: Events + ?Sized> Events for &mut E {
    fn connecting(&mut self, address: &str, port: u16) {
        (**self).connecting(address, port)
    }
    fn connected(&mut self, greeting: &Response) {
        (**self).connected(greeting)
    }
    fn sent(&mut self, command: &str) {
        (**self).sent(command)
    }
    fn sent_data(&mut self, len: usize) {
        (**self).sent_data(len)
    }
    fn received(&mut self, response: &Response) {
        (**self).received(response)
    }
    fn accepted(&mut self, response: &Response) {
        (**self).accepted(response)
    }
    fn closing(&mut self) {
        (**self).closing()
    }
    fn completed(&mut self) {
        (**self).completed()
    }
    fn failed(&mut self, error: &Error) {
        (**self).failed(error)
    }
}
