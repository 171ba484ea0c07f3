//! # novachat - Streaming Chat Client Library
//!
//! A small, pragmatic Rust library for chatting with an SSE-streaming
//! completion service: send the conversation, watch the reply grow fragment
//! by fragment, keep the history persisted.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental SSE decoding that tolerates arbitrary chunk splits
//! - Explicit stream state machine (`Streaming` / `Done` / `Closed` / `Failed`)
//! - Pluggable persistence behind the `MessageStore` trait
//! - Optimistic history with rollback on failed turns
//!
//! ## Architecture
//!
//! The decoding core is a pipeline of small, separately testable pieces:
//!
//! 1. **`sse::LineBuffer`** frames raw bytes into lines
//! 2. **`sse::classify`** sorts lines into data, ignorable, and unrecognized
//! 3. **`delta::decode_delta`** extracts the text fragment from a data payload
//! 4. **`stream::StreamAssembler`** accumulates fragments into the reply
//!
//! `session::ChatSession` drives that pipeline over a real HTTP response and
//! keeps conversation history in sync with a `store::MessageStore`.
//!
//! ## Example
//! ```no_run
//! use novachat::{ChatClient, ChatConfig, ChatSession, MemoryStore, RenderSink};
//!
//! struct Printer;
//!
//! impl RenderSink for Printer {
//!     fn on_fragment(&mut self, cumulative: &str) {
//!         print!("\r{}", cumulative);
//!     }
//!     fn on_turn_error(&mut self) {
//!         eprintln!("turn failed");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ChatConfig::new("https://api.example.com/v1/chat/completions")
//!         .with_api_key("your-api-key");
//!
//!     let mut session = ChatSession::new(ChatClient::new(config), MemoryStore::new());
//!
//!     let reply = session.send("Hello!", &mut Printer).await?;
//!     println!("\nfinal: {}", reply);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod delta;
pub mod http;
pub mod model;
pub mod session;
pub mod sse;
pub mod store;
pub mod stream;

// Re-exports for convenience
pub use client::{ChatClient, ChatError};
pub use config::{ChatConfig, SecretString};
pub use model::{ChatMessage, Role};
pub use session::{ChatSession, RenderSink};
pub use store::{MemoryStore, MessageStore, StoreError};
pub use stream::{StreamAssembler, StreamState};
