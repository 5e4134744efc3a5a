#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod content;
pub mod error;
pub mod sessions;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use config::ContentClientConfig;
pub use content::{ContentClient, GeneratedQuiz, GenerationRequest, HttpContentClient};
pub use error::{AppServicesError, ConfigError, ContentError, ServiceError};
pub use sessions::{
    ControllerState, GenerationTicket, HistoryListItem, SessionController, SessionProgress,
    SubmitOutcome, UserError,
};
