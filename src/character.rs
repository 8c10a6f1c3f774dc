use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// The six classic ability scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    pub current: i32,
    pub max: i32,
}

impl Vitals {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }
}

// What the LLM hands back when asked to create a character, before any asset is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub name: String,
    pub gender: String,
    pub race: String,
    pub class: String,
    pub description: String,
    pub background: String,
    pub abilities: AbilityScores,
    pub hp: i32,
    pub nemesis_name: String,
    pub nemesis_description: String,
}

/// The single live character of a player in a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub player_id: String,
    pub campaign_name: String,

    pub name: String,
    pub gender: String,
    pub race: String,
    pub class: String,
    pub description: String,
    pub background: String,
    pub abilities: AbilityScores,

    pub health: Vitals,
    pub mana: Vitals,
    pub level: u32,

    pub nemesis_name: String,
    pub nemesis_description: String,

    pub portrait_url: Option<String>,
    pub skybox_url: Option<String>, // The character's "home" environment.

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Character {
    // A fresh level 1 character. Mana starts equal to health.
    pub fn from_sheet(
        campaign_name: impl Into<String>,
        player_id: impl Into<String>,
        sheet: CharacterSheet,
    ) -> Self {
        let now = Utc::now().trunc_subsecs(6);
        Self {
            player_id: player_id.into(),
            campaign_name: campaign_name.into(),
            name: sheet.name,
            gender: sheet.gender,
            race: sheet.race,
            class: sheet.class,
            description: sheet.description,
            background: sheet.background,
            abilities: sheet.abilities,
            health: Vitals::full(sheet.hp),
            mana: Vitals::full(sheet.hp),
            level: 1,
            nemesis_name: sheet.nemesis_name,
            nemesis_description: sheet.nemesis_description,
            portrait_url: None,
            skybox_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_assets(mut self, portrait_url: String, skybox_url: String) -> Self {
        self.portrait_url = Some(portrait_url);
        self.skybox_url = Some(skybox_url);
        self
    }

    /// Renders the character sheet in the tag schema the narrative prompt expects.
    pub fn to_sheet_xml(&self) -> String {
        let mut xml = String::from("<character_sheet>\n");
        push_tag(&mut xml, "name", &self.name);
        push_tag(&mut xml, "class", &self.class);
        push_tag(&mut xml, "level", &self.level.to_string());
        push_tag(&mut xml, "gender", &self.gender);
        push_tag(&mut xml, "race", &self.race);
        push_tag(&mut xml, "description", &self.description);
        push_tag(&mut xml, "health_points", &self.health.current.to_string());
        push_tag(&mut xml, "mana_points", &self.mana.current.to_string());
        xml.push_str("<nemesis>\n");
        push_tag(&mut xml, "name", &self.nemesis_name);
        push_tag(&mut xml, "description", &self.nemesis_description);
        xml.push_str("</nemesis>\n");
        xml.push_str("</character_sheet>");
        xml
    }
}

fn push_tag(xml: &mut String, tag: &str, value: &str) {
    xml.push_str(&format!("<{tag}>{}</{tag}>\n", escape_text(value)));
}

pub(crate) fn escape_text(value: &str) -> String {
    quick_xml::escape::partial_escape(value).into_owned()
}

/// Keyed by (campaign, player); at most one character per pair.
#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn get(&self, campaign_name: &str, player_id: &str) -> Result<Option<Character>>;

    /// Returns `false` when the pair already has a character.
    async fn insert(&self, character: &Character) -> Result<bool>;
}
