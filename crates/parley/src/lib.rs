//! Parley: finite-state dialogue engine

pub mod bot {
    pub use parley_bot::{
        BOT_FILE, Bot, BotBuilder, BotConfig, CLASSIFIER_FILE, ClassificationSpec,
        ClassifierConfig, DEFAULT_BOT_NAME, DOMAIN_FILE, KeywordClassifier, Turn, normalize,
    };
}

pub mod classifier {
    pub use parley_bot::{ClassifierConfig, KeywordClassifier};
    pub use parley_core::{Classifier, Prediction};
}

pub mod error {
    pub use parley_core::{ParleyError, Result};
}

pub mod extension {
    pub use parley_extension::{
        DEFAULT_TIMEOUT, ExtensionConfig, ExtensionGateway, ExtensionReply, ExtensionRequest,
        ExtensionResponse, ExtensionTransport, HttpRequest, HttpResponse, HttpTransport,
        RpcRequest, RpcResponse, RpcTransport, create_gateway,
    };

    pub mod server {
        pub use parley_extension::server::{
            ExtensionHandler, ExtensionRegistry, http_router, serve_rpc,
        };
    }
}

pub mod fsm {
    pub use parley_fsm::{
        Defaults, Domain, DomainView, EXTENSION_PREFIX, ExtensionCall, FsmConfig, FunctionSpec,
        MessagePayload, Resolution, SlotEntry, SlotMode, SlotRule, SlotSpec, TransitionKey,
        TransitionRecord, TransitionSpec, TurnOutcome, WILDCARD, WILDCARD_STATE_ID,
        candidate_keys, resolve,
    };
}

pub mod message {
    pub use parley_core::{Answer, AnswerSpec, MessageSpec};
}

pub mod store {
    pub use parley_core::{Session, SessionStore};
    pub use parley_store::{
        DEFAULT_SHARDS, MemoryStore, RedisStore, SenderGuard, SenderLocks, StoreConfig,
        create_store,
    };
}

pub use bot::{Bot, BotBuilder, BotConfig, Turn};
pub use error::{ParleyError, Result};
pub use fsm::Domain;
pub use message::Answer;
pub use store::Session;
