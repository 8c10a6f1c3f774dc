use async_trait::async_trait;
use rusqlite::params;

use super::{Database, insert_unless_duplicate};
use crate::error::Result;
use crate::event_log::{CampaignEvent, EventLog};

pub struct SqliteEventLog {
    db: Database,
}

impl SqliteEventLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventLog for SqliteEventLog {
    async fn append(&self, event: &CampaignEvent) -> Result<bool> {
        let id = event.id.to_string();
        let campaign = event.campaign_name.clone();
        let created_at = event.created_at.timestamp_micros();
        let document = serde_json::to_string(event)?;

        let appended = self
            .db
            .connection()
            .call(move |conn| {
                Ok(insert_unless_duplicate(conn.execute(
                    "INSERT INTO campaign_events (id, campaign_name, created_at, document)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![id, campaign, created_at, document],
                ))?)
            })
            .await?;

        if !appended {
            log::warn!("Campaign event {} already exists", event.id);
        }
        Ok(appended)
    }

    async fn replace(&self, event: &CampaignEvent) -> Result<bool> {
        let id = event.id.to_string();
        let campaign = event.campaign_name.clone();
        let created_at = event.created_at.timestamp_micros();
        let document = serde_json::to_string(event)?;

        let changed = self
            .db
            .connection()
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT INTO campaign_events (id, campaign_name, created_at, document)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                        campaign_name = excluded.campaign_name,
                        created_at = excluded.created_at,
                        document = excluded.document",
                    params![id, campaign, created_at, document],
                )?;
                Ok(changed)
            })
            .await?;

        Ok(changed > 0)
    }

    async fn ordered_events(&self, campaign_name: &str) -> Result<Vec<CampaignEvent>> {
        let campaign = campaign_name.to_string();
        let documents = self
            .db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT document FROM campaign_events
                     WHERE campaign_name = ?1
                     ORDER BY created_at ASC, rowid ASC",
                )?;
                let rows = stmt
                    .query_map(params![campaign], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let events = documents
            .iter()
            .map(|doc| serde_json::from_str(doc))
            .collect::<std::result::Result<Vec<CampaignEvent>, _>>()?;
        Ok(events)
    }
}
