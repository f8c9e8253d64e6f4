use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use sqlsage_core::{ChatModel, ChatRequest, ChatResponse, Message, SqlSageError};
use tokio::sync::Mutex;

/// A chat model that replays canned responses in order and records what it was asked.
#[derive(Clone)]
pub struct ScriptedChatModel {
    responses: Arc<Mutex<VecDeque<ChatResponse>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedChatModel {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shorthand for a model answering with plain AI messages.
    pub fn from_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            replies
                .into_iter()
                .map(|reply| ChatResponse {
                    message: Message::ai(reply),
                    usage: None,
                })
                .collect(),
        )
    }

    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, SqlSageError> {
        self.requests.lock().await.push(request);
        let mut responses = self.responses.lock().await;
        responses
            .pop_front()
            .ok_or_else(|| SqlSageError::Model("scripted model exhausted responses".to_string()))
    }
}
