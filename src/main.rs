use std::sync::Arc;

use chatrpg::campaign::{GameMaster, GameMasterConfig, NewCharacterRequest};
use chatrpg::gateway::{OpenAICompletion, OpenAIEmbedder, ScenarioClient, SkyboxClient};
use chatrpg::message::{ChannelNotifier, Envelope};
use chatrpg::resolver::AssetResolver;
use chatrpg::semantic_cache::AssetKind;
use chatrpg::settings::Settings;
use chatrpg::store::{Database, SqliteAssetCache, SqliteCharacterStore, SqliteEventLog};
use chatrpg::{Error, WorldState, logging};
use color_eyre::eyre::{Result, WrapErr, eyre};
use log::LevelFilter;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const USAGE: &str = "usage: chatrpg <campaign> <player>";

enum Command {
    NewCharacter([String; 3]),
    Ready,
    Quit,
    Action(String),
}

fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    if line == "/quit" {
        return Ok(Command::Quit);
    }
    if line == "/ready" {
        return Ok(Command::Ready);
    }
    if let Some(cards) = line.strip_prefix("/new") {
        let cards: Vec<String> = cards
            .split(',')
            .map(|card| card.trim().to_string())
            .filter(|card| !card.is_empty())
            .collect();
        return <[String; 3]>::try_from(cards)
            .map(Command::NewCharacter)
            .map_err(|_| "pick exactly three cards: /new <card>, <card>, <card>".to_string());
    }
    Ok(Command::Action(line.to_string()))
}

fn build_game_master(
    settings: &Settings,
    db: Database,
) -> Result<(GameMaster, mpsc::UnboundedReceiver<Envelope>)> {
    let openai_key = settings
        .openai_api_key
        .as_deref()
        .ok_or_else(|| eyre!("no OpenAI API key (set OPENAI_API_KEY)"))?;
    let blockade_key = settings
        .blockade_api_key
        .as_deref()
        .ok_or_else(|| eyre!("no Blockade Labs API key (set BLOCKADE_API_KEY)"))?;
    let scenario_key = settings
        .scenario_api_key
        .as_deref()
        .ok_or_else(|| eyre!("no Scenario API key (set SCENARIO_API_KEY)"))?;

    let http = reqwest::Client::new();
    let embedder = Arc::new(OpenAIEmbedder::new(
        openai_key,
        settings.embedding_model.clone(),
        settings.embedding_dimensions,
    ));

    let skyboxes = AssetResolver::new(
        AssetKind::Skybox,
        embedder.clone(),
        Arc::new(SqliteAssetCache::new(db.clone(), AssetKind::Skybox)),
        Arc::new(SkyboxClient::new(
            http.clone(),
            settings.blockade_base_url.clone(),
            blockade_key,
            settings.skybox_style,
        )),
    )
    .with_policy(settings.poll_policy())
    .with_threshold(settings.similarity_threshold);

    let portraits = AssetResolver::new(
        AssetKind::Portrait,
        embedder,
        Arc::new(SqliteAssetCache::new(db.clone(), AssetKind::Portrait)),
        Arc::new(ScenarioClient::new(
            http,
            settings.scenario_base_url.clone(),
            scenario_key,
            settings.scenario_model.clone(),
        )),
    )
    .with_policy(settings.poll_policy())
    .with_threshold(settings.similarity_threshold);

    let (notifier, notifications) = ChannelNotifier::new();
    let game_master = GameMaster::new(
        Arc::new(OpenAICompletion::new(openai_key)),
        Arc::new(SqliteEventLog::new(db.clone())),
        Arc::new(SqliteCharacterStore::new(db)),
        Arc::new(skyboxes),
        Arc::new(portraits),
        Arc::new(notifier),
        GameMasterConfig::from(settings),
    );
    Ok((game_master, notifications))
}

fn print_world(world: &WorldState) {
    println!("\n== {} ==", world.room_name);
    println!("{}", world.story);
    if !world.characters.is_empty() {
        println!("Characters: {}", world.characters.join(", "));
    }
    if !world.items.is_empty() {
        println!("Items: {}", world.items.join(", "));
    }
    if let Some(dm) = &world.dm {
        println!("[DM] {}", dm);
    }
    if let Some(url) = &world.skybox_url {
        println!("Skybox: {}", url);
    }
    println!();
}

async fn run_command(
    game_master: &GameMaster,
    campaign: &str,
    player: &str,
    command: Command,
    cancel: &CancellationToken,
) -> chatrpg::Result<()> {
    match command {
        Command::NewCharacter(cards) => {
            let request = NewCharacterRequest {
                campaign_name: campaign.to_string(),
                player_id: player.to_string(),
                cards,
            };
            let character = game_master.new_character(request, cancel).await?;
            println!(
                "You are {}, a {} {} {} ({} HP).",
                character.name, character.gender, character.race, character.class, character.health.max
            );
            println!("Nemesis: {}", character.nemesis_name);
        }
        Command::Ready => {
            let world = game_master.ready_campaign(campaign, player, cancel).await?;
            print_world(&world);
        }
        Command::Action(action) => {
            let world = game_master.play_action(campaign, player, &action, cancel).await?;
            print_world(&world);
        }
        Command::Quit => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let mut args = std::env::args().skip(1);
    let (campaign, player) = match (args.next(), args.next()) {
        (Some(campaign), Some(player)) => (campaign, player),
        _ => return Err(eyre!(USAGE)),
    };

    let data_dir = Settings::data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    let settings = Settings::load()
        .unwrap_or_else(|_| {
            let settings = Settings::default();
            let _ = settings.save();
            settings
        })
        .with_env_overrides();

    let level = if settings.debug_mode {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::init(data_dir, level).map_err(|e| eyre!("logger: {e}"))?;

    let db_path = settings.database_path()?;
    let db = Database::open(&db_path)
        .await
        .wrap_err_with(|| format!("opening {}", db_path.display()))?;
    let (game_master, mut notifications) = build_game_master(&settings, db)?;

    tokio::spawn(async move {
        while let Some(Envelope {
            player_id,
            notification,
        }) = notifications.recv().await
        {
            log::debug!("{} <- {}", player_id, notification.topic());
        }
    });

    match game_master.get_character(&campaign, &player).await {
        Ok(character) => println!("Welcome back, {}. Type /ready to continue.", character.name),
        Err(Error::NotFound { .. }) => {
            println!("No character yet. Pick three tarot cards: /new <card>, <card>, <card>")
        }
        Err(e) => return Err(e.into()),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(usage) => {
                println!("{}", usage);
                continue;
            }
        };

        let cancel = CancellationToken::new();
        let work = run_command(&game_master, &campaign, &player, command, &cancel);
        tokio::pin!(work);
        let outcome = tokio::select! {
            outcome = &mut work => outcome,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                work.await
            }
        };

        if let Err(e) = outcome {
            log::warn!("{}: {}", e.code(), e);
            if e.is_retriable() {
                println!("{} (you can try again)", e);
            } else {
                println!("{}", e);
            }
        }
    }

    Ok(())
}
