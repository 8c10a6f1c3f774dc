use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};

use super::{Database, insert_unless_duplicate};
use crate::character::{Character, CharacterStore};
use crate::error::Result;

pub struct SqliteCharacterStore {
    db: Database,
}

impl SqliteCharacterStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CharacterStore for SqliteCharacterStore {
    async fn get(&self, campaign_name: &str, player_id: &str) -> Result<Option<Character>> {
        let campaign = campaign_name.to_string();
        let player = player_id.to_string();

        let document = self
            .db
            .connection()
            .call(move |conn| {
                let document = conn
                    .query_row(
                        "SELECT document FROM campaign_characters
                         WHERE campaign_name = ?1 AND player_id = ?2",
                        params![campaign, player],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(document)
            })
            .await?;

        match document {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, character: &Character) -> Result<bool> {
        let campaign = character.campaign_name.clone();
        let player = character.player_id.clone();
        let document = serde_json::to_string(character)?;

        let inserted = self
            .db
            .connection()
            .call(move |conn| {
                Ok(insert_unless_duplicate(conn.execute(
                    "INSERT INTO campaign_characters (campaign_name, player_id, document)
                     VALUES (?1, ?2, ?3)",
                    params![campaign, player, document],
                ))?)
            })
            .await?;

        Ok(inserted)
    }
}
