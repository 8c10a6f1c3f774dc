use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::error::Result;
use crate::message::WorldState;

// Mood music tags the client knows how to play.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Music {
    Exploration,
    Battle,
    Chill,
}

/// One persisted narrative turn of a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignEvent {
    pub id: Uuid,
    pub campaign_name: String,
    pub created_at: DateTime<Utc>, // Ordering key within a campaign.
    pub room_name: String,
    pub story: String,
    pub description: String,
    pub music: String, // Kept verbatim, see `mood()`.
    pub characters: Vec<String>,
    pub items: Vec<String>,
    pub dm: Option<String>,
    pub skybox_url: Option<String>,
}

impl Music {
    /// "exploration, battle, chill"
    pub fn choices() -> String {
        Music::iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl CampaignEvent {
    pub fn new(
        campaign_name: impl Into<String>,
        room_name: impl Into<String>,
        story: impl Into<String>,
        description: impl Into<String>,
        music: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_name: campaign_name.into(),
            // Stored as integer microseconds, so keep no finer precision in memory either.
            created_at: Utc::now().trunc_subsecs(6),
            room_name: room_name.into(),
            story: story.into(),
            description: description.into(),
            music: music.into(),
            characters: Vec::new(),
            items: Vec::new(),
            dm: None,
            skybox_url: None,
        }
    }

    pub fn mood(&self) -> Option<Music> {
        Music::from_str(self.music.trim()).ok()
    }

    pub fn to_world_state(&self) -> WorldState {
        WorldState {
            room_name: self.room_name.clone(),
            description: self.description.clone(),
            music: self.music.clone(),
            story: self.story.clone(),
            characters: self.characters.clone(),
            items: self.items.clone(),
            dm: self.dm.clone(),
            skybox_url: self.skybox_url.clone(),
        }
    }
}

/// Append-only, per-campaign history of events.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Returns `false` if an event with the same id already exists.
    async fn append(&self, event: &CampaignEvent) -> Result<bool>;

    /// Upserts by id. Used to attach a resolved skybox to the latest event.
    async fn replace(&self, event: &CampaignEvent) -> Result<bool>;

    /// Every event of `campaign_name`, oldest first.
    async fn ordered_events(&self, campaign_name: &str) -> Result<Vec<CampaignEvent>>;
}
