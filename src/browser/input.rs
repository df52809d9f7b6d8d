//! Dispatch seam shared by the keyboard and mouse.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;
use crate::identifiers::SessionId;
use crate::protocol::{Command, InputCommand};
use crate::transport::Connection;

/// Destination for synthesized input events.
///
/// Mouse events are posted so a dialog opened by a click cannot stall the
/// sequence that caused it. Key events are sent and acknowledged one by
/// one.
#[async_trait]
pub trait InputSink: Send + Sync {
    /// Posts one input command without waiting for the reply.
    fn dispatch(&self, command: InputCommand);

    /// Sends one input command and waits until the browser acknowledged it.
    async fn send(&self, command: InputCommand) -> Result<()>;
}

/// Sends input to a page session over a connection.
pub struct PageInput {
    connection: Connection,
    session_id: Option<SessionId>,
}

impl PageInput {
    /// Creates a sink for the given session.
    #[must_use]
    pub fn new(connection: Connection, session_id: Option<SessionId>) -> Arc<Self> {
        Arc::new(Self {
            connection,
            session_id,
        })
    }
}

#[async_trait]
impl InputSink for PageInput {
    fn dispatch(&self, command: InputCommand) {
        self.connection
            .post(self.session_id.clone(), Command::Input(command));
    }

    async fn send(&self, command: InputCommand) -> Result<()> {
        self.connection
            .execute(self.session_id.clone(), Command::Input(command))
            .await
            .map(drop)
    }
}

/// Records input for inspection instead of sending it.
#[derive(Default)]
pub struct RecordingInput {
    commands: Mutex<Vec<InputCommand>>,
}

impl RecordingInput {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns everything dispatched so far.
    #[must_use]
    pub fn commands(&self) -> Vec<InputCommand> {
        self.commands.lock().clone()
    }

    /// Concatenates the text of every `char` key event, which is what a
    /// focused text field would receive.
    #[must_use]
    pub fn typed_text(&self) -> String {
        self.commands
            .lock()
            .iter()
            .filter_map(|c| match c {
                InputCommand::DispatchKeyEvent {
                    event_type, text, ..
                } if event_type == "char" => text.clone(),
                InputCommand::InsertText { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl InputSink for RecordingInput {
    fn dispatch(&self, command: InputCommand) {
        self.commands.lock().push(command);
    }

    async fn send(&self, command: InputCommand) -> Result<()> {
        self.commands.lock().push(command);
        Ok(())
    }
}
