//! Bot assembly and the per-turn pipeline
//!
//! A bot directory holds `fsm.yml` (the domain), and optionally `bot.yml` (name,
//! threshold, extension and store settings) and `clf.yml` (keyword classifier).

mod bot;
mod builder;
mod classifier;
mod config;

pub use bot::{Bot, DOMAIN_FILE, Turn};
pub use builder::BotBuilder;
pub use classifier::{
    CLASSIFIER_FILE, ClassificationSpec, ClassifierConfig, KeywordClassifier, normalize,
};
pub use config::{BOT_FILE, BotConfig, DEFAULT_BOT_NAME};
