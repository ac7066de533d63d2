//! Chat turns end to end: persist the user message, ask the agent,
//! persist the reply.

use crate::agent::Agent;
use crate::state::Database;
use crate::types::{AgentResponse, ChatRecord, Role};
use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Title given to a chat before its first message arrives.
pub const DEFAULT_TITLE: &str = "New Chat";
const TITLE_CHARS: usize = 30;

/// Derive a chat title from its first message.
pub fn title_from_message(message: &str) -> String {
    let message = message.trim();
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(TITLE_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Conversation front door for one user.
pub struct ChatService {
    db: Arc<Mutex<Database>>,
    agent: Arc<Agent>,
    user_id: String,
}

impl ChatService {
    pub fn new(db: Arc<Mutex<Database>>, agent: Arc<Agent>, user_id: impl Into<String>) -> Self {
        Self {
            db,
            agent,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn start_chat(&self) -> Result<ChatRecord> {
        let db = self.db.lock().await;
        let chat = db.create_chat(&self.user_id, DEFAULT_TITLE)?;
        info!("Started chat {}", chat.id);
        Ok(chat)
    }

    /// Handle one user message in `chat_id` and return the agent's reply.
    pub async fn send(&self, chat_id: &str, message: &str) -> Result<AgentResponse> {
        let message = message.trim();
        if message.is_empty() {
            bail!("Message must not be empty");
        }

        let history = {
            let db = self.db.lock().await;
            let Some(chat) = db.get_chat(chat_id, &self.user_id)? else {
                bail!("Chat {} not found", chat_id);
            };
            db.add_message(chat_id, &self.user_id, Role::User, message, None)?;
            if chat.messages.is_empty() {
                db.update_chat_title(chat_id, &self.user_id, &title_from_message(message))?;
            }
            chat.history()
        };

        debug!("Chat {}: {} prior messages", chat_id, history.len());
        let response = self.agent.process_user_query(message, &history).await;

        let db = self.db.lock().await;
        db.add_message(
            chat_id,
            &self.user_id,
            Role::Bot,
            &response.text,
            response.tool_output.as_ref(),
        )?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentSettings, APOLOGY};
    use crate::llm::testing::ScriptedModel;
    use crate::tools::ToolRegistry;

    fn service(model: Arc<ScriptedModel>) -> ChatService {
        let agent = Agent::new(model, Arc::new(ToolRegistry::new()), AgentSettings::default());
        let db = Database::open_memory().unwrap();
        ChatService::new(Arc::new(Mutex::new(db)), Arc::new(agent), "alice")
    }

    #[test]
    fn titles_are_cut_at_thirty_chars() {
        assert_eq!(title_from_message("  short question  "), "short question");
        assert_eq!(
            title_from_message("What is the tallest mountain in the solar system?"),
            "What is the tallest mountain i..."
        );
        assert_eq!(title_from_message(&"é".repeat(30)), "é".repeat(30));
    }

    #[tokio::test]
    async fn first_message_retitles_and_both_turns_are_stored() {
        let model = Arc::new(ScriptedModel::replying(&[
            r#"{"tool": null, "params": {}}"#,
            "Hello! How can I help?",
            r#"{"tool": null, "params": {}}"#,
            "Sure.",
        ]));
        let chats = service(model.clone());
        let chat = chats.start_chat().await.unwrap();
        assert_eq!(chat.title, DEFAULT_TITLE);

        let reply = chats.send(&chat.id, "hi there").await.unwrap();
        assert_eq!(reply.text, "Hello! How can I help?");
        chats.send(&chat.id, "another question").await.unwrap();

        let stored = chats.db.lock().await.get_chat(&chat.id, "alice").unwrap().unwrap();
        assert_eq!(stored.title, "hi there");
        let roles: Vec<_> = stored.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::User, Role::Bot, Role::User, Role::Bot]);

        // Second selection prompt saw the first exchange as history.
        assert!(model.prompts()[2].contains("User: hi there\nBot: Hello! How can I help?"));
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_the_agent() {
        let model = Arc::new(ScriptedModel::failing());
        let chats = service(model.clone());
        let chat = chats.start_chat().await.unwrap();

        assert!(chats.send(&chat.id, "   ").await.is_err());
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn unknown_chat_is_an_error() {
        let chats = service(Arc::new(ScriptedModel::failing()));
        let err = chats.send("01NOPE", "hi").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn apology_is_persisted_like_any_reply() {
        let chats = service(Arc::new(ScriptedModel::failing()));
        let chat = chats.start_chat().await.unwrap();
        let reply = chats.send(&chat.id, "hi").await.unwrap();
        assert_eq!(reply.text, APOLOGY);

        let stored = chats.db.lock().await.get_chat(&chat.id, "alice").unwrap().unwrap();
        assert_eq!(stored.messages[1].text, APOLOGY);
    }
}
