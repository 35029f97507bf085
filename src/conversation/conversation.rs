use super::message::{Message, Role};

/// Ordered, append-only dialogue between the agent loop and the model
///
/// Owned by a single agent run and dropped when the run ends.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a conversation with a system prompt and the caller's request
    pub fn seeded(system_prompt: impl Into<String>, request: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.add_message(Message::system(system_prompt));
        conversation.add_user_message(request);
        conversation
    }

    /// Append a message
    pub fn add_message(&mut self, message: Message) {
        tracing::trace!(
            "Adding {} message ({} chars)",
            message.role,
            message.content.len()
        );
        self.messages.push(message);
    }

    /// Append a user message
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::user(content))
    }

    /// Append an assistant message
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::assistant(content))
    }

    /// All messages in insertion order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Last message, if any
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages with the given role
    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total content length, used for rough token estimates
    pub fn total_chars(&self) -> usize {
        self.messages.iter().map(|m| m.content.len()).sum()
    }
}
