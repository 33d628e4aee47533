//! Application state management

use crate::auth::jwt::JwtConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use velund_core::config::AppConfig;
use velund_core::{LlmClient, MarketStore};

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// JWT signing configuration
    pub jwt: JwtConfig,
    /// Marketplace persistence
    pub store: Arc<dyn MarketStore>,
    /// External language model
    pub llm: Arc<dyn LlmClient>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
}

impl AppState {
    /// Create new application state with config
    pub fn new(config: AppConfig, store: Arc<dyn MarketStore>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            config,
            jwt: JwtConfig::from_env(),
            store,
            llm,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
