//! Interactive console: type body pairs, see the node's replies.
//!
//! ```text
//! OMS_CONSOLE_ADDR=127.0.0.1:8080 cargo run -p oms-server --example wire_console
//! >> 35=D;11=abc;54=1;38=10;44=100.00;15=GBP
//! >> 35=QR;10001=list
//! ```

use std::env;
use std::error::Error;
use std::io::{self, Write};
use std::time::Duration;

use oms_protocol::{decode, tags, timestamp, FrameDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let addr = env::var("OMS_CONSOLE_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    println!("Connecting to {}...", addr);
    let mut stream = TcpStream::connect(&addr).await?;
    println!("Connected.");
    println!("Type body pairs like:");
    println!("  35=D;11=abc;54=1;38=10;44=100.00;15=GBP");
    println!("  35=H;11=abc          (status, store only)");
    println!("  35=QR;10001=list     (admin)");
    println!("Type 'quit' or 'exit' to leave.\n");

    let stdin = io::stdin();
    let mut frames = FrameDecoder::default();
    let mut buf = [0u8; 2048];

    loop {
        print!(">> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!("\nEOF on stdin, exiting console.");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            println!("Exiting console.");
            break;
        }

        let message = match decode(trimmed.as_bytes()) {
            Ok(message) => message.with(tags::SENDING_TIME, timestamp::now_utc()),
            Err(e) => {
                eprintln!("Could not parse line: {}", e);
                continue;
            }
        };

        let frame = message.encoded();
        println!("-> {}", String::from_utf8_lossy(&frame));
        stream.write_all(&frame).await?;

        // Print whatever arrives shortly after.
        loop {
            let n = match timeout(Duration::from_millis(200), stream.read(&mut buf)).await {
                Ok(Ok(0)) => {
                    println!("Connection closed by peer.");
                    return Ok(());
                }
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => break,
            };

            frames.extend(&buf[..n]);
            while let Some(frame) = frames.next_frame()? {
                println!("<- {}", String::from_utf8_lossy(&frame));
            }
        }
    }

    Ok(())
}
