//! Interactive terminal chat against a streaming completions endpoint.
//!
//! Run with:
//! ```bash
//! export CHAT_ENDPOINT="https://api.openai.com/v1/chat/completions"
//! export CHAT_API_KEY="your-api-key"
//! cargo run --example chat
//! ```

use std::io::{self, BufRead, Write};

use novachat::{ChatClient, ChatConfig, ChatSession, MemoryStore, RenderSink};

/// Prints each new piece of the reply as it streams in.
struct ConsoleSink {
    rendered: usize,
}

impl RenderSink for ConsoleSink {
    fn on_fragment(&mut self, cumulative: &str) {
        // Only the suffix we have not printed yet.
        print!("{}", &cumulative[self.rendered..]);
        let _ = io::stdout().flush();
        self.rendered = cumulative.len();
    }

    fn on_turn_error(&mut self) {
        eprintln!("\n[turn failed, your message was not kept]");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    let endpoint =
        std::env::var("CHAT_ENDPOINT").expect("CHAT_ENDPOINT environment variable must be set");
    let api_key =
        std::env::var("CHAT_API_KEY").expect("CHAT_API_KEY environment variable must be set");

    let config = ChatConfig::new(endpoint).with_api_key(api_key);
    let mut session = ChatSession::new(ChatClient::new(config), MemoryStore::new());

    println!("Type a message, /clear to wipe history, /quit to exit.\n");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break; // EOF
        }
        let input = input.trim();

        match input {
            "" => continue,
            "/quit" => break,
            "/clear" => {
                session.clear().await?;
                println!("(history cleared)");
            }
            _ => {
                let mut sink = ConsoleSink { rendered: 0 };
                if session.send(input, &mut sink).await.is_ok() {
                    println!();
                }
            }
        }
    }

    Ok(())
}
