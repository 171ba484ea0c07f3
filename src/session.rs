//! Conversation orchestration: optimistic history, streamed turns, rollback.
//!
//! [`ChatSession`] owns the in-memory conversation and coordinates one turn
//! at a time: persist the user entry, open the completion stream, drive a
//! [`StreamAssembler`](crate::stream::StreamAssembler) over the response
//! body, and persist the finished reply. Failures roll the optimistic user
//! entry back out of the conversation and notify the render sink once.

use futures::StreamExt;
use tracing::{debug, warn};

use crate::client::{ChatClient, ChatError};
use crate::model::ChatMessage;
use crate::store::MessageStore;
use crate::stream::StreamAssembler;

/// Rendering callbacks for one streamed turn.
///
/// Implemented by whatever displays the conversation: a terminal printer, a
/// UI channel, a test recorder.
pub trait RenderSink {
    /// The reply so far. Called with the full accumulated text each time a
    /// fragment arrives, so implementations replace rather than append.
    fn on_fragment(&mut self, cumulative: &str);

    /// The turn failed after the user entry was shown. Called exactly once
    /// per failed turn; implementations should remove the rendered user entry
    /// and discard any partially rendered assistant output, returning the
    /// view to its pre-turn state to mirror the rolled-back history.
    fn on_turn_error(&mut self);
}

/// A conversation bound to one transport and one store.
///
/// `send` takes `&mut self`, so a session processes one turn at a time by
/// construction. Cancel an in-flight turn by dropping its future: the
/// transport closes and no further callbacks fire, but the optimistic user
/// entry stays in history until [`ChatSession::load`] or
/// [`ChatSession::clear`] reconciles it.
pub struct ChatSession<S> {
    client: ChatClient,
    store: S,
    history: Vec<ChatMessage>,
}

impl<S: MessageStore> ChatSession<S> {
    /// Create a session with an empty in-memory conversation.
    pub fn new(client: ChatClient, store: S) -> Self {
        Self {
            client,
            store,
            history: Vec::new(),
        }
    }

    /// Hydrate the in-memory conversation from the store.
    pub async fn load(&mut self) -> Result<(), ChatError> {
        self.history = self.store.list().await?;
        debug!("Loaded {} persisted messages", self.history.len());
        Ok(())
    }

    /// The conversation so far, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// The backing message store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Send one user message and stream the assistant's reply.
    ///
    /// The user entry joins the history immediately and the full conversation
    /// is sent to the service. Each delta fragment reaches
    /// `render.on_fragment` as the cumulative reply text. On success the
    /// finished reply is persisted, appended to history, and returned; a
    /// reply with no content is returned as an empty string and not
    /// persisted.
    ///
    /// On any failure the optimistic user entry is removed from history
    /// again, `render.on_turn_error` fires once, and the error propagates.
    /// The user entry already persisted to the store is left in place.
    pub async fn send(
        &mut self,
        user_text: impl Into<String>,
        render: &mut impl RenderSink,
    ) -> Result<String, ChatError> {
        let user = ChatMessage::user(user_text);
        self.history.push(user.clone());

        match self.run_turn(user, render).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!("Chat turn failed, rolling back user entry: {}", e);
                self.history.pop();
                render.on_turn_error();
                Err(e)
            }
        }
    }

    async fn run_turn(
        &mut self,
        user: ChatMessage,
        render: &mut impl RenderSink,
    ) -> Result<String, ChatError> {
        debug!(
            "Starting chat turn with {} prior messages",
            self.history.len() - 1
        );
        self.store.append(user).await?;

        let response = self.client.open_stream(&self.history).await?;
        let reply = assemble_reply(response, render).await?;

        if reply.is_empty() {
            debug!("Chat turn produced no reply content");
            return Ok(reply);
        }

        let assistant = ChatMessage::assistant(reply.clone());
        self.store.append(assistant.clone()).await?;
        self.history.push(assistant);
        debug!("Chat turn complete, reply length {}", reply.len());
        Ok(reply)
    }

    /// Delete every persisted message and reset the in-memory conversation.
    pub async fn clear(&mut self) -> Result<(), ChatError> {
        self.store.delete_all().await?;
        self.history.clear();
        Ok(())
    }
}

/// Drive an assembler over the response body and return the finished reply.
///
/// A read error fails the assembler and surfaces as
/// [`ChatError::StreamTransport`]; a stream that ends without the terminal
/// sentinel closes normally and keeps its text.
async fn assemble_reply(
    response: reqwest::Response,
    render: &mut impl RenderSink,
) -> Result<String, ChatError> {
    let mut rendered = String::new();
    let mut assembler = StreamAssembler::new(|fragment: &str| {
        rendered.push_str(fragment);
        render.on_fragment(&rendered);
    });

    let mut body = Box::pin(response.bytes_stream());
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => assembler.push_chunk(&bytes),
            Err(e) => {
                assembler.fail();
                return Err(ChatError::StreamTransport(e));
            }
        }
        if assembler.state().is_terminal() {
            break;
        }
    }
    assembler.finish();

    Ok(assembler.into_message())
}
