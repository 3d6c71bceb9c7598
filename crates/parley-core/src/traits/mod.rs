//! Collaborator traits consumed by the dialogue engine

pub mod classifier;
pub mod store;

pub use classifier::Classifier;
pub use store::SessionStore;
