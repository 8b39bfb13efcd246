//! Shared stub of the generative service for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use flashcards_ai::{
    GenerativeModel, LLMService, ServiceError,
    api::{AppState, create_router},
};

/// Scripted model: fixed token count, fixed reply or failure.
pub struct StubModel {
    pub token_count: Result<u32, ServiceError>,
    pub reply: Result<String, String>,
    pub rate_limited: bool,
    generate_calls: AtomicUsize,
    count_calls: AtomicUsize,
}

impl StubModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            token_count: Ok(64),
            reply: Ok(reply.to_string()),
            rate_limited: false,
            generate_calls: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::replying("")
        }
    }

    pub fn with_token_count(mut self, count: u32) -> Self {
        self.token_count = Ok(count);
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for StubModel {
    async fn count_tokens(&self, _prompt: &str) -> Result<u32, ServiceError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        match &self.token_count {
            Ok(count) => Ok(*count),
            Err(e) => Err(ServiceError::Other(e.to_string())),
        }
    }

    async fn generate_content(&self, _prompt: &str) -> Result<String, ServiceError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if self.rate_limited {
            return Err(ServiceError::RateLimited("RESOURCE_EXHAUSTED".to_string()));
        }
        self.reply.clone().map_err(ServiceError::Other)
    }

    fn provider_name(&self) -> &'static str {
        "Stub"
    }

    fn model_name(&self) -> &str {
        "stub-model"
    }
}

pub fn create_test_server(stub: Arc<StubModel>) -> TestServer {
    let llm_service = LLMService::from_model(stub);
    let app = create_router(AppState::new(llm_service));
    TestServer::new(app).unwrap()
}
