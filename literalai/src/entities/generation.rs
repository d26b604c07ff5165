//! Generation records: the LLM-call payload embeddable in a step.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Metadata;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// End user.
    User,
    /// Model.
    Assistant,
    /// Tool result.
    Tool,
    /// Legacy function result.
    Function,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
            Self::Function => write!(f, "function"),
        }
    }
}

/// A single chat message of a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMessage {
    /// Author role.
    pub role: MessageRole,
    /// Message content (text or structured parts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    /// Optional author name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl GenerationMessage {
    /// Creates a text message.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(serde_json::Value::String(content.into())),
            name: None,
            tool_call_id: None,
        }
    }
}

/// Fields shared by every generation kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationBase {
    /// Generation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Model provider (e.g. "openai").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Model name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Call settings (temperature, max tokens, ...).
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub settings: Metadata,
    /// Total tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u64>,
    /// Prompt tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_token_count: Option<u64>,
    /// Completion tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_token_count: Option<u64>,
    /// Call duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Time to first token in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tt_first_token: Option<f64>,
    /// Output tokens per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_throughput_in_seconds: Option<f64>,
    /// Tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A chat-style generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatGeneration {
    /// Shared fields.
    #[serde(flatten)]
    pub base: GenerationBase,
    /// Ordered input messages.
    #[serde(default)]
    pub messages: Vec<GenerationMessage>,
    /// The completion message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_completion: Option<GenerationMessage>,
}

/// A completion-style generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionGeneration {
    /// Shared fields.
    #[serde(flatten)]
    pub base: GenerationBase,
    /// Prompt text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Completion text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<String>,
}

/// An LLM call. The variant is the `type` discriminator and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Generation {
    /// Chat generation.
    #[serde(rename = "CHAT")]
    Chat(ChatGeneration),
    /// Completion generation.
    #[serde(rename = "COMPLETION")]
    Completion(CompletionGeneration),
}

impl Generation {
    /// Returns the discriminator as sent on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat(_) => "CHAT",
            Self::Completion(_) => "COMPLETION",
        }
    }

    /// Returns the shared fields.
    #[must_use]
    pub fn base(&self) -> &GenerationBase {
        match self {
            Self::Chat(chat) => &chat.base,
            Self::Completion(completion) => &completion.base,
        }
    }

    /// Returns the shared fields mutably.
    pub fn base_mut(&mut self) -> &mut GenerationBase {
        match self {
            Self::Chat(chat) => &mut chat.base,
            Self::Completion(completion) => &mut completion.base,
        }
    }

    /// Returns the generation id, if assigned.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.base().id.as_deref()
    }

    /// Input payload for the `llm` step recording this generation.
    #[must_use]
    pub fn step_input(&self) -> serde_json::Value {
        match self {
            Self::Chat(chat) => serde_json::json!({ "messages": chat.messages }),
            Self::Completion(completion) => serde_json::json!({ "content": completion.prompt }),
        }
    }

    /// Output payload for the `llm` step recording this generation.
    #[must_use]
    pub fn step_output(&self) -> Option<serde_json::Value> {
        match self {
            Self::Chat(chat) => chat
                .message_completion
                .as_ref()
                .and_then(|message| serde_json::to_value(message).ok()),
            Self::Completion(completion) => completion
                .completion
                .as_ref()
                .map(|text| serde_json::json!({ "content": text })),
        }
    }
}

impl From<ChatGeneration> for Generation {
    fn from(chat: ChatGeneration) -> Self {
        Self::Chat(chat)
    }
}

impl From<CompletionGeneration> for Generation {
    fn from(completion: CompletionGeneration) -> Self {
        Self::Completion(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chat() -> Generation {
        ChatGeneration {
            base: GenerationBase {
                provider: Some("openai".to_string()),
                model: Some("gpt-4o".to_string()),
                input_token_count: Some(12),
                ..GenerationBase::default()
            },
            messages: vec![GenerationMessage::new(MessageRole::User, "hi")],
            message_completion: Some(GenerationMessage::new(MessageRole::Assistant, "hello")),
        }
        .into()
    }

    #[test]
    fn test_chat_wire_shape() {
        let value = serde_json::to_value(chat()).unwrap();

        assert_eq!(value["type"], "CHAT");
        assert_eq!(value["provider"], "openai");
        assert_eq!(value["inputTokenCount"], 12);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messageCompletion"]["content"], "hello");
    }

    #[test]
    fn test_discriminator_selects_variant() {
        let generation: Generation = serde_json::from_value(json!({
            "type": "COMPLETION",
            "model": "davinci",
            "prompt": "Say hi",
            "completion": "hi"
        }))
        .unwrap();

        assert_eq!(generation.kind(), "COMPLETION");
        assert_eq!(generation.base().model.as_deref(), Some("davinci"));
        match generation {
            Generation::Completion(c) => assert_eq!(c.completion.as_deref(), Some("hi")),
            Generation::Chat(_) => panic!("expected a completion generation"),
        }
    }

    #[test]
    fn test_step_payloads() {
        let generation = chat();
        assert_eq!(generation.step_input()["messages"][0]["content"], "hi");
        assert_eq!(generation.step_output().unwrap()["role"], "assistant");

        let completion: Generation = CompletionGeneration {
            prompt: Some("p".to_string()),
            completion: Some("c".to_string()),
            ..CompletionGeneration::default()
        }
        .into();
        assert_eq!(completion.step_input(), json!({"content": "p"}));
        assert_eq!(completion.step_output(), Some(json!({"content": "c"})));
    }

    #[test]
    fn test_base_mut_sets_id() {
        let mut generation = chat();
        generation.base_mut().id = Some("g1".to_string());
        assert_eq!(generation.id(), Some("g1"));
    }
}
