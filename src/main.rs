use anyhow::Context;
use plain_smtp::{Error, Events, Response, SessionParameters, send_email};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};

/// Prints the session as it happens.
struct Console;

impl Events for Console {
    fn connecting(&mut self, address: &str, port: u16) {
        println!("[*] Connecting to {address}:{port}...");
    }

    fn connected(&mut self, greeting: &Response) {
        println!("[+] Connected. Server says: {greeting}");
    }

    fn sent(&mut self, command: &str) {
        println!("[Client] -> {command}");
    }

    fn sent_data(&mut self, _len: usize) {
        println!("[Client] -> [Message Data with Headers]");
    }

    fn received(&mut self, response: &Response) {
        println!("[Server] <- {response}");
    }

    fn accepted(&mut self, _response: &Response) {
        println!("[+] Message accepted for delivery.");
    }

    fn closing(&mut self) {
        println!("[*] Closing socket.");
    }

    fn completed(&mut self) {
        println!("[+] Session closed.");
    }

    fn failed(&mut self, error: &Error) {
        eprintln!("\n[ERROR] {error}");
    }
}

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
    stdout: Stdout,
}

impl Prompt {
    fn new() -> Self {
        Prompt {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            stdout: tokio::io::stdout(),
        }
    }

    async fn ask(&mut self, question: &str) -> anyhow::Result<String> {
        self.stdout.write_all(question.as_bytes()).await?;
        self.stdout.flush().await?;
        self.lines
            .next_line()
            .await?
            .context("input closed before all fields were entered")
    }
}

async fn run() -> anyhow::Result<()> {
    let mut prompt = Prompt::new();

    let server = prompt.ask("Enter SMTP server IP: ").await?;
    let ehlo_domain = prompt
        .ask("Enter EHLO domain (e.g., example.com): ")
        .await?;
    let from = prompt.ask("Enter MAIL FROM address: ").await?;
    let to = prompt.ask("Enter RCPT TO address: ").await?;
    let subject = prompt.ask("Enter email subject: ").await?;
    let is_html = prompt
        .ask("Send as HTML? (y/n): ")
        .await?
        .trim()
        .eq_ignore_ascii_case("y");
    let body = if is_html {
        prompt.ask("Enter email body (HTML format):\n").await?
    } else {
        prompt.ask("Enter email body (plain text):\n").await?
    };

    let mut params = SessionParameters::new(server.trim())
        .with_from(from)
        .with_to(to)
        .with_subject(subject)
        .with_body(body)
        .with_html(is_html);
    if !ehlo_domain.trim().is_empty() {
        params = params.with_ehlo_domain(ehlo_domain.trim());
    }

    // the outcome has already been printed by `Console`
    let _ = send_email(&params, Console).await;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("--- Simple Manual SMTP Client (HTML Support) ---");

    // dropping `run` on Ctrl-C drops any open session, which releases its socket
    let cancelled = tokio::select! {
        result = run() => {
            if let Err(err) = result {
                eprintln!("\n[ERROR] An unexpected error occurred: {err:#}");
            }
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if cancelled {
        println!("\n[INFO] Process cancelled by user.");
        // the stdin reader may still be parked in a blocking read
        std::process::exit(0);
    }
}
