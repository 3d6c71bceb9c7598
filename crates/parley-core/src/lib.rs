//! Core types and traits for the parley dialogue engine

pub mod error;
pub mod message;
pub mod session;
pub mod traits;

pub use error::{ParleyError, Result};
pub use message::{Answer, AnswerSpec, MessageSpec};
pub use session::Session;
pub use traits::classifier::{Classifier, Prediction};
pub use traits::store::SessionStore;
