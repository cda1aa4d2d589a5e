pub mod config;
pub mod dialogue;
pub mod errors;
pub mod ports;
pub mod session;

pub use config::{AppConfig, BusinessProfile, ConfigError, ConfigOverrides, LoadOptions};
pub use dialogue::{Choice, DialogueEngine, Reply};
pub use errors::TurnError;
pub use ports::{
    BookingConfirmation, BookingRequest, CollaboratorError, IntakeRecord, IntakeSink,
    InventoryService, InventoryStatus, SchedulingService,
};
pub use session::{
    CompletedFlow, FlowCategory, FlowStep, Session, SessionError, SessionStore, UserGates,
};

/// Messaging platform a turn arrived on. Carried through resolution for
/// logging and delivery routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Meta,
    WeChat,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::WeChat => "wechat",
        }
    }
}
