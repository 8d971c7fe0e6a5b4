/// Ollama HTTP client module.
///
/// This module provides a blocking HTTP client for the Ollama API covering
/// text generation, tool-calling chat, and embeddings, including error
/// handling, retry logic, and timeout configuration.
mod chat;
mod client;

pub use chat::{
    ChatMessage, ChatRole, FunctionCall, FunctionDefinition, ToolCallRequest, ToolDefinition,
};
pub use client::{OllamaClient, OllamaClientBuilder, OllamaClientTrait, OllamaError};
