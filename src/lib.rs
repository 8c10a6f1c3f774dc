pub mod ai_response;
pub mod campaign;
pub mod character;
pub mod error;
pub mod event_log;
pub mod gateway;
pub mod logging;
pub mod message;
pub mod prompt;
pub mod resolver;
pub mod semantic_cache;
pub mod settings;
pub mod store;

// Re-export commonly used items for easier access
pub use ai_response::{parse_campaign_event, parse_character_sheet};
pub use campaign::{GameMaster, GameMasterConfig, NewCharacterRequest};
pub use character::{AbilityScores, Character, CharacterSheet, CharacterStore, Vitals};
pub use error::{Error, Result};
pub use event_log::{CampaignEvent, EventLog, Music};
pub use message::{Notification, Notifier, WorldState};
pub use prompt::{PromptMode, build_prompt};
pub use resolver::{AssetOrigin, AssetResolver, ResolvedAsset, WriteBack};
pub use semantic_cache::{AssetKind, GeneratedAsset, SemanticCache};
pub use settings::Settings;
