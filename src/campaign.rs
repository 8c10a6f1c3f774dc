use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::ai_response::{parse_campaign_event, parse_character_sheet};
use crate::character::{Character, CharacterStore};
use crate::error::{Error, Result};
use crate::event_log::{CampaignEvent, EventLog};
use crate::gateway::CompletionClient;
use crate::message::{Notification, Notifier, WorldState};
use crate::prompt::{PromptMode, build_prompt, character_creation_prompt};
use crate::resolver::AssetResolver;
use crate::settings::{DEFAULT_SKYBOX_URL, Settings};

#[derive(Debug, Clone, PartialEq)]
pub struct GameMasterConfig {
    pub narrative_model: String,
    pub max_tokens: u32,
    pub default_skybox_url: String,
    pub use_vector_search: bool,
}

impl Default for GameMasterConfig {
    fn default() -> Self {
        Self {
            narrative_model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            default_skybox_url: DEFAULT_SKYBOX_URL.to_string(),
            use_vector_search: true,
        }
    }
}

impl From<&Settings> for GameMasterConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            narrative_model: settings.narrative_model.clone(),
            max_tokens: settings.max_tokens,
            default_skybox_url: settings.default_skybox_url.clone(),
            use_vector_search: settings.use_vector_search,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCharacterRequest {
    pub campaign_name: String,
    pub player_id: String,
    pub cards: [String; 3],
}

/// Runs campaigns: narrates turns, keeps the event log and resolves the art.
pub struct GameMaster {
    completion: Arc<dyn CompletionClient>,
    events: Arc<dyn EventLog>,
    characters: Arc<dyn CharacterStore>,
    skyboxes: Arc<AssetResolver>,
    portraits: Arc<AssetResolver>,
    notifier: Arc<dyn Notifier>,
    config: GameMasterConfig,
}

impl GameMaster {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        events: Arc<dyn EventLog>,
        characters: Arc<dyn CharacterStore>,
        skyboxes: Arc<AssetResolver>,
        portraits: Arc<AssetResolver>,
        notifier: Arc<dyn Notifier>,
        config: GameMasterConfig,
    ) -> Self {
        Self {
            completion,
            events,
            characters,
            skyboxes,
            portraits,
            notifier,
            config,
        }
    }

    // One completion round trip. Dropped as soon as the caller cancels.
    async fn narrate(&self, prompt: &str, cancel: &CancellationToken) -> Result<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            text = self.completion.complete(prompt, &self.config.narrative_model, self.config.max_tokens) => text,
        }
    }

    /// Introduces a new campaign, or recaps an active one for a returning player.
    ///
    /// Only the introduction is written to the log. A recap carries the
    /// latest skybox forward and leaves the log untouched.
    pub async fn ready(
        &self,
        campaign_name: &str,
        character: &Character,
        cancel: &CancellationToken,
    ) -> Result<CampaignEvent> {
        let history = self.events.ordered_events(campaign_name).await?;

        match history.last() {
            None => {
                log::info!("Starting campaign '{}' for {}", campaign_name, character.name);
                let prompt = build_prompt(character, &history, &PromptMode::New);
                let text = self.narrate(&prompt, cancel).await?;

                let mut event = parse_campaign_event(campaign_name, &text)?;
                event.skybox_url = Some(self.config.default_skybox_url.clone());

                if !self.events.append(&event).await? {
                    return Err(Error::FailedToSaveCampaignEvent(event.id.to_string()));
                }
                Ok(event)
            }
            Some(latest) => {
                log::info!(
                    "Resuming campaign '{}' ({} events) for {}",
                    campaign_name,
                    history.len(),
                    character.name
                );
                let prompt = build_prompt(character, &history, &PromptMode::Resume);
                let text = self.narrate(&prompt, cancel).await?;

                let mut event = parse_campaign_event(campaign_name, &text)?;
                event.skybox_url = latest.skybox_url.clone();
                Ok(event)
            }
        }
    }

    /// Applies a player action: narrates it, logs the new event, then dresses
    /// the new room with a skybox. A skybox that cannot be resolved leaves the
    /// saved event without one.
    pub async fn play(
        &self,
        campaign_name: &str,
        character: &Character,
        action: &str,
        cancel: &CancellationToken,
    ) -> Result<CampaignEvent> {
        let history = self.events.ordered_events(campaign_name).await?;
        let prompt = build_prompt(character, &history, &PromptMode::Action(action.to_string()));
        let text = self.narrate(&prompt, cancel).await?;

        let mut event = parse_campaign_event(campaign_name, &text)?;
        if !self.events.append(&event).await? {
            return Err(Error::FailedToSaveCampaignEvent(event.id.to_string()));
        }

        let skybox = match self
            .skyboxes
            .resolve(&event.description, self.config.use_vector_search, cancel)
            .await
        {
            Ok(skybox) => skybox,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                log::warn!(
                    "No skybox for '{}' in campaign '{}': {}",
                    event.room_name,
                    campaign_name,
                    e
                );
                return Ok(event);
            }
        };

        event.skybox_url = Some(skybox.url);
        if !self.events.replace(&event).await? {
            return Err(Error::FailedToSaveCampaignEvent(event.id.to_string()));
        }
        Ok(event)
    }

    async fn require_character(&self, campaign_name: &str, player_id: &str) -> Result<Character> {
        self.characters
            .get(campaign_name, player_id)
            .await?
            .ok_or_else(|| Error::NotFound {
                campaign: campaign_name.to_string(),
                player: player_id.to_string(),
            })
    }

    pub async fn get_character(&self, campaign_name: &str, player_id: &str) -> Result<Character> {
        self.require_character(campaign_name, player_id).await
    }

    pub async fn ready_campaign(
        &self,
        campaign_name: &str,
        player_id: &str,
        cancel: &CancellationToken,
    ) -> Result<WorldState> {
        let character = self.require_character(campaign_name, player_id).await?;
        let event = self.ready(campaign_name, &character, cancel).await?;

        let world = event.to_world_state();
        self.notifier
            .notify(player_id, Notification::WorldUpdate(world.clone()));
        Ok(world)
    }

    pub async fn play_action(
        &self,
        campaign_name: &str,
        player_id: &str,
        action: &str,
        cancel: &CancellationToken,
    ) -> Result<WorldState> {
        let character = self.require_character(campaign_name, player_id).await?;
        let event = self.play(campaign_name, &character, action, cancel).await?;

        let world = event.to_world_state();
        self.notifier
            .notify(player_id, Notification::WorldUpdate(world.clone()));
        Ok(world)
    }

    /// Creates the player's character from three tarot cards, with a portrait
    /// drawn from its description and a home skybox from its background.
    pub async fn new_character(
        &self,
        request: NewCharacterRequest,
        cancel: &CancellationToken,
    ) -> Result<Character> {
        let prompt = character_creation_prompt(&request.cards);
        let text = self.narrate(&prompt, cancel).await?;
        let sheet = parse_character_sheet(&text)?;

        self.notifier.notify(
            &request.player_id,
            Notification::CharacterPreview(sheet.clone()),
        );

        let use_cache = self.config.use_vector_search;
        let (portrait, skybox) = futures::future::try_join(
            self.portraits.resolve(&sheet.description, use_cache, cancel),
            self.skyboxes.resolve(&sheet.background, use_cache, cancel),
        )
        .await?;

        let character = Character::from_sheet(&request.campaign_name, &request.player_id, sheet)
            .with_assets(portrait.url, skybox.url);

        if !self.characters.insert(&character).await? {
            return Err(Error::FailedToSaveCharacter(format!(
                "{} already has a character in campaign '{}'",
                request.player_id, request.campaign_name
            )));
        }
        log::info!(
            "Created {} the {} {} for {} in '{}'",
            character.name,
            character.race,
            character.class,
            character.player_id,
            character.campaign_name
        );

        self.notifier.notify(
            &request.player_id,
            Notification::CharacterCreated(character.clone()),
        );
        Ok(character)
    }
}
