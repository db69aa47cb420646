//! Context Engine Core Components
//!
//! The pieces that run before the model is called:
//! - Intent detection and entity extraction
//! - Context lookup against the catalog
//! - Prompt composition

mod composer;
mod intent;
mod resolver;

pub use composer::{
    PromptComposer, CLOSING_INSTRUCTION, PERSONA_GENERIC, PERSONA_NETWORK_SUPPORT, PERSONA_SALES,
    SECTION_SEPARATOR,
};
pub use intent::{
    is_device_category, Entities, EntityKey, Extraction, Intent, IntentExtractor, DEVICE_CATEGORIES,
};
pub use resolver::{format_price, ContextResolver, GENERIC_DEVICE_CONTEXT};
