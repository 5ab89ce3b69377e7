//! Core domain types and traits for the Ragmind reasoning agent.
//!
//! This crate is dependency-light by design: it defines the contracts the
//! rest of the system is written against.
//!
//! - [`capability`] — the Capability trait, results, and the registry the
//!   reasoning loop dispatches into
//! - [`model`] — the model-calling collaborator trait (complete + stream)
//! - [`message`] — chat message / conversation value objects
//! - [`error`] — the error taxonomy

pub mod capability;
pub mod error;
pub mod message;
pub mod model;

pub use capability::{Capability, CapabilityRegistry, CapabilityResult, ParamSpec};
pub use error::{CapabilityError, Error, ModelError, Result};
pub use message::{ChatMessage, Conversation, Role};
pub use model::{FragmentReceiver, ModelClient};
