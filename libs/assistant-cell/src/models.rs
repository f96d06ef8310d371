use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `user` or `assistant`
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Attach this patient's record as context. Access-checked in the handler.
    pub patient_id: Option<Uuid>,
}

impl ChatRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.messages.is_empty() {
            return Err("At least one message is required".to_string());
        }
        for message in &self.messages {
            if message.content.trim().is_empty() {
                return Err("Messages cannot be empty".to_string());
            }
            if message.role != "user" && message.role != "assistant" {
                return Err(format!("Unknown message role: {}", message.role));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conversations_are_rejected() {
        let request = ChatRequest { messages: vec![], patient_id: None };
        assert!(request.validate().is_err());
    }

    #[test]
    fn unknown_roles_are_rejected() {
        let request = ChatRequest {
            messages: vec![ChatMessage { role: "system".to_string(), content: "hi".to_string() }],
            patient_id: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn a_user_message_passes() {
        let request = ChatRequest {
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Suggest exercises for knee rehab".to_string(),
            }],
            patient_id: None,
        };
        assert!(request.validate().is_ok());
    }
}
