//! End-to-end tests of `send_email` against a scripted SMTP server listening on
//! loopback.

use std::time::Duration;

use plain_smtp::{ConnectionError, Error, ProtocolError, SessionParameters, Stage, send_email};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpListener,
    task::JoinHandle,
};

/// What the scripted server does after reading each client line.
#[derive(Clone, Copy)]
enum Reply {
    /// Answer with this line
    Line(&'static str),
    /// Read the message data up to the terminator, then answer with this line
    AfterData(&'static str),
    /// Never answer
    Silence,
}

/// Accepts a single client, sends `greeting`, then plays `script`. Resolves to
/// everything the client sent.
async fn scripted_server(
    greeting: &'static str,
    script: Vec<Reply>,
) -> (u16, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut read = BufReader::new(read);
        let mut transcript = String::new();

        write
            .write_all(format!("{greeting}\r\n").as_bytes())
            .await
            .unwrap();

        for reply in script {
            let mut line = String::new();
            if read.read_line(&mut line).await.unwrap() == 0 {
                return transcript;
            }
            transcript.push_str(&line);

            match reply {
                Reply::Line(answer) => {
                    write
                        .write_all(format!("{answer}\r\n").as_bytes())
                        .await
                        .unwrap();
                }
                Reply::AfterData(answer) => {
                    write.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await.unwrap();
                    while !transcript.ends_with("\r\n.\r\n") {
                        let mut line = String::new();
                        if read.read_line(&mut line).await.unwrap() == 0 {
                            return transcript;
                        }
                        transcript.push_str(&line);
                    }
                    write
                        .write_all(format!("{answer}\r\n").as_bytes())
                        .await
                        .unwrap();
                }
                Reply::Silence => {
                    // hold the connection open until the client gives up
                    let mut rest = Vec::new();
                    let _ = read.read_to_end(&mut rest).await;
                    transcript.push_str(&String::from_utf8_lossy(&rest));
                    return transcript;
                }
            }
        }

        // client should close after QUIT
        let mut rest = Vec::new();
        let _ = read.read_to_end(&mut rest).await;
        transcript.push_str(&String::from_utf8_lossy(&rest));
        transcript
    });

    (port, handle)
}

fn params(port: u16) -> SessionParameters {
    SessionParameters::new("127.0.0.1")
        .with_port(port)
        .with_timeout(Duration::from_secs(5))
        .with_ehlo_domain("client.example.com")
        .with_from("sender@example.com")
        .with_to("recipient@example.com")
        .with_subject("Over TCP")
        .with_body("Hello over loopback")
}

#[tokio::test]
async fn delivers_over_tcp() {
    let (port, server) = scripted_server(
        "220 localhost ESMTP",
        vec![
            Reply::Line("250 localhost"),
            Reply::Line("250 OK"),
            Reply::Line("250 OK"),
            Reply::AfterData("250 OK: queued"),
            Reply::Line("221 Bye"),
        ],
    )
    .await;

    let accepted = send_email(&params(port), ()).await.expect("delivery");
    assert_eq!(accepted.to_string(), "250 OK: queued");

    let transcript = server.await.unwrap();
    assert!(transcript.starts_with(
        "EHLO client.example.com\r\n\
         MAIL FROM:<sender@example.com>\r\n\
         RCPT TO:<recipient@example.com>\r\n\
         DATA\r\n\
         From: sender@example.com\r\n"
    ));
    assert!(transcript.ends_with("\r\n\r\nHello over loopback\r\n.\r\nQUIT\r\n"));
}

#[tokio::test]
async fn bad_greeting_sends_nothing() {
    let (port, server) = scripted_server("421 Service not available", vec![]).await;

    let err = send_email(&params(port), ()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Connection(ConnectionError::Greeting { .. })
    ));
    assert!(err.to_string().contains("421 Service not available"));

    // the server sees EOF straight away, so the connection was closed
    assert_eq!(server.await.unwrap(), "");
}

#[tokio::test]
async fn rejected_recipient_aborts_and_closes() {
    let (port, server) = scripted_server(
        "220 localhost ESMTP",
        vec![
            Reply::Line("250 localhost"),
            Reply::Line("250 OK"),
            Reply::Line("550 No such user"),
        ],
    )
    .await;

    let err = send_email(&params(port), ()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError {
            stage: Stage::RcptTo,
            ..
        })
    ));

    let transcript = server.await.unwrap();
    assert!(transcript.ends_with("RCPT TO:<recipient@example.com>\r\n"));
    assert!(!transcript.contains("DATA"));
}

#[tokio::test]
async fn silent_server_times_out() {
    let (port, server) =
        scripted_server("220 localhost ESMTP", vec![Reply::Silence]).await;

    let params = params(port).with_timeout(Duration::from_millis(200));
    let err = send_email(&params, ()).await.unwrap_err();
    assert!(matches!(err, Error::Timeout));

    // the server only finishes once the client has closed its end
    let transcript = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("connection should have been closed")
        .unwrap();
    assert_eq!(transcript, "EHLO client.example.com\r\n");
}

#[tokio::test]
async fn nothing_listening() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = send_email(&params(port), ()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Connection(ConnectionError::Refused { .. })
    ));
    assert!(err.to_string().starts_with(&format!("Could not connect to 127.0.0.1:{port}.")));
}

#[tokio::test]
async fn line_break_in_recipient_never_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let params = params(port).with_to("recipient@example.com>\r\nDATA");
    let err = send_email(&params, ()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { field: "recipient" }));

    let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(accepted.is_err(), "no connection should have been attempted");
}
