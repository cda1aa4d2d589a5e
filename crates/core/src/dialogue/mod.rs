//! Turn resolution: token rules, reply templates, and the engine that
//! stitches them together with the session store and collaborators.

pub mod engine;
pub mod replies;
pub mod rules;

pub use engine::DialogueEngine;
pub use replies::{Choice, Reply};
pub use rules::{match_token, StatelessTopic, TokenRule};
