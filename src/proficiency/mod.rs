pub mod config;
pub mod estimator;
pub mod irt;
pub mod mastery;
pub mod persistence;
pub mod selector;
pub mod session;
pub mod types;

pub use config::EngineConfig;
pub use persistence::ProficiencyRepository;
pub use selector::{ItemSelector, Selection, SelectionReason};
pub use session::{SessionController, SessionSummary};
pub use types::*;
