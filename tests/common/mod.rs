// Hand-written fakes for the collaborator traits.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chatrpg::character::{AbilityScores, Character, CharacterSheet};
use chatrpg::error::{Error, Result};
use chatrpg::gateway::{
    CompletionClient, Embedder, GeneratedImage, ImageGenerator, JobHandle, JobStatus, Submission,
};
use chatrpg::semantic_cache::{GeneratedAsset, SemanticCache, cosine_similarity};

pub const TAVERN_RESPONSE: &str = "<ROOM_NAME>Tavern</ROOM_NAME><STORY>You enter.</STORY><DESCRIPTION>Dim room.</DESCRIPTION><MUSIC>chill</MUSIC>";

pub fn tarinth(campaign: &str, player: &str) -> Character {
    let sheet = CharacterSheet {
        name: "Tarinth".to_string(),
        gender: "Female".to_string(),
        race: "Half-Elf".to_string(),
        class: "Ranger".to_string(),
        description: "A lean half-elf ranger in a mossy green cloak.".to_string(),
        background: "Raised on the edge of the Cloakwood.".to_string(),
        abilities: AbilityScores {
            strength: 12,
            dexterity: 16,
            constitution: 13,
            intelligence: 10,
            wisdom: 14,
            charisma: 9,
        },
        hp: 11,
        nemesis_name: "Vask".to_string(),
        nemesis_description: "A Red Wizard who burned her village.".to_string(),
    };
    Character::from_sheet(campaign, player, sheet)
}

/// Answers completions from a queue and records every prompt.
#[derive(Default)]
pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, prompt: &str, _model: &str, _max_tokens: u32) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Upstream("no scripted completion left".to_string()))
    }
}

/// Fixed vectors per text, `[1, 1, 1, 1]` for anything else.
#[derive(Default)]
pub struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    pub calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new(vectors: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: vectors
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![1.0, 1.0, 1.0, 1.0]))
    }
}

/// A semantic cache kept in a vector, scored by brute force.
#[derive(Default)]
pub struct MemoryCache {
    assets: Mutex<Vec<GeneratedAsset>>,
    pub nearest_calls: AtomicUsize,
    pub last_k: AtomicUsize,
    pub write_calls: AtomicUsize,
    pub fail_writes: bool,
}

impl MemoryCache {
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn seed(&self, asset: GeneratedAsset) {
        self.assets.lock().unwrap().push(asset);
    }

    pub fn len(&self) -> usize {
        self.assets.lock().unwrap().len()
    }
}

#[async_trait]
impl SemanticCache for MemoryCache {
    async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<GeneratedAsset>> {
        self.nearest_calls.fetch_add(1, Ordering::SeqCst);
        self.last_k.store(k, Ordering::SeqCst);
        let mut scored: Vec<GeneratedAsset> = self
            .assets
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(|mut asset| {
                asset.score = Some(cosine_similarity(embedding, &asset.embedding));
                asset
            })
            .collect();
        scored.sort_by(|a, b| b.score.unwrap().total_cmp(&a.score.unwrap()));
        scored.truncate(k);
        Ok(scored)
    }

    async fn write(&self, asset: &GeneratedAsset) -> Result<bool> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(Error::Persistence("disk full".to_string()));
        }
        let mut assets = self.assets.lock().unwrap();
        if assets.iter().any(|a| a.file_url == asset.file_url) {
            return Ok(false);
        }
        assets.push(asset.clone());
        Ok(true)
    }
}

/// Image provider that replays a script of statuses. The last status repeats forever.
pub struct ScriptedGenerator {
    on_submit: JobStatus,
    statuses: Mutex<VecDeque<JobStatus>>,
    last: Mutex<JobStatus>,
    pub submits: AtomicUsize,
    pub polls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(on_submit: JobStatus, statuses: Vec<JobStatus>) -> Self {
        Self {
            on_submit,
            statuses: Mutex::new(statuses.into()),
            last: Mutex::new(JobStatus::Pending),
            submits: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    /// Finishes on submission with `url`.
    pub fn immediate(url: &str) -> Self {
        Self::new(succeeded(url), Vec::new())
    }

    pub fn pending_forever() -> Self {
        Self::new(JobStatus::Pending, Vec::new())
    }

    /// Reports pending `pending` times, then succeeds with `url`.
    pub fn pending_then_success(pending: usize, url: &str) -> Self {
        let mut statuses = vec![JobStatus::Pending; pending];
        statuses.push(succeeded(url));
        Self::new(JobStatus::Pending, statuses)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }
}

pub fn succeeded(url: &str) -> JobStatus {
    JobStatus::Succeeded(GeneratedImage {
        file_url: url.to_string(),
        ..Default::default()
    })
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    fn model_id(&self) -> String {
        "scripted".to_string()
    }

    async fn submit(&self, _prompt: &str) -> Result<Submission> {
        let n = self.submits.fetch_add(1, Ordering::SeqCst);
        Ok(Submission {
            handle: JobHandle(format!("job-{n}")),
            status: self.on_submit.clone(),
        })
    }

    async fn status(&self, _handle: &JobHandle) -> Result<JobStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.statuses.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}
