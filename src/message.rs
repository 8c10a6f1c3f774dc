use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::character::{Character, CharacterSheet};

/// What the client sees of the current room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub room_name: String,
    pub description: String,
    pub music: String,
    pub story: String,
    pub characters: Vec<String>,
    pub items: Vec<String>,
    pub dm: Option<String>,
    pub skybox_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload")]
pub enum Notification {
    #[serde(rename = "character.preview")]
    CharacterPreview(CharacterSheet),
    #[serde(rename = "character.created")]
    CharacterCreated(Character),
    #[serde(rename = "world.update")]
    WorldUpdate(WorldState),
}

impl Notification {
    pub fn topic(&self) -> &'static str {
        match self {
            Notification::CharacterPreview(_) => "character.preview",
            Notification::CharacterCreated(_) => "character.created",
            Notification::WorldUpdate(_) => "world.update",
        }
    }
}

// Fire-and-forget push to a player. Delivery failures never fail the request.
pub trait Notifier: Send + Sync {
    fn notify(&self, player_id: &str, notification: Notification);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub player_id: String,
    pub notification: Notification,
}

pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Envelope>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, player_id: &str, notification: Notification) {
        let topic = notification.topic();
        let envelope = Envelope {
            player_id: player_id.to_string(),
            notification,
        };
        if self.sender.send(envelope).is_err() {
            log::warn!("Dropped {} notification for {}: no receiver", topic, player_id);
        }
    }
}
