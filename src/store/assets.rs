use async_trait::async_trait;
use rusqlite::params;

use super::{Database, insert_unless_duplicate};
use crate::error::Result;
use crate::semantic_cache::{AssetKind, GeneratedAsset, SemanticCache, cosine_similarity};

/// Generated assets of one kind, searched with sqlite-vec.
#[derive(Clone)]
pub struct SqliteAssetCache {
    db: Database,
    kind: AssetKind,
}

impl SqliteAssetCache {
    pub fn new(db: Database, kind: AssetKind) -> Self {
        Self { db, kind }
    }

    fn table(&self) -> &'static str {
        match self.kind {
            AssetKind::Portrait => "portraits",
            AssetKind::Skybox => "skyboxes",
        }
    }
}

pub(crate) fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[async_trait]
impl SemanticCache for SqliteAssetCache {
    async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<GeneratedAsset>> {
        let sql = format!(
            "SELECT document FROM {} ORDER BY vec_distance_cosine(embedding, ?1) LIMIT ?2",
            self.table()
        );
        let blob = embedding_to_blob(embedding);
        let limit = k as i64;

        let documents = self
            .db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![blob, limit], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let mut candidates = documents
            .iter()
            .map(|doc| serde_json::from_str::<GeneratedAsset>(doc))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for candidate in &mut candidates {
            candidate.score = Some(cosine_similarity(embedding, &candidate.embedding));
        }
        candidates.sort_by(|a, b| {
            b.score
                .unwrap_or(f64::MIN)
                .total_cmp(&a.score.unwrap_or(f64::MIN))
        });

        log::debug!(
            "{} nearest {} candidates, best score {:?}",
            self.kind,
            candidates.len(),
            candidates.first().and_then(|c| c.score)
        );
        Ok(candidates)
    }

    async fn write(&self, asset: &GeneratedAsset) -> Result<bool> {
        let sql = format!(
            "INSERT INTO {} (id, file_url, embedding, document) VALUES (?1, ?2, ?3, ?4)",
            self.table()
        );
        let id = asset.id.to_string();
        let file_url = asset.file_url.clone();
        let blob = embedding_to_blob(&asset.embedding);
        let document = serde_json::to_string(asset)?;

        let inserted = self
            .db
            .connection()
            .call(move |conn| {
                Ok(insert_unless_duplicate(conn.execute(
                    &sql,
                    params![id, file_url, blob, document],
                ))?)
            })
            .await?;

        if !inserted {
            log::info!("{} {} was already cached", self.kind, asset.file_url);
        }
        Ok(inserted)
    }
}
