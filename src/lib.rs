// Core modules
pub mod core;
pub mod service;
pub mod backend;
pub mod cli;
pub mod common;

// Re-export commonly used types
pub use common::{Config, DevMode, DeepGuardError, Result};
pub use core::{AlertPresenter, DetectorAdapter, FlowOutcome, FlowState, HeadlessPage, Page, VerificationOrchestrator};
pub use service::{protocol, Session, SessionApi, SessionClient};
