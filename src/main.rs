use anyhow::Context;
use log::{error, info};
use std::env;
use std::future::pending;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::task::{JoinError, JoinHandle};

mod config;
mod console;
mod error;
mod gesture;
mod handoff;
mod midi;
mod note;
mod pattern;
mod playback;
mod tempo;

use config::{load_config, PlaybackMode, DEFAULT_CONFIG_PATH};
use error::DeviceError;
use gesture::Detector;
use playback::{InlinePlayer, Voice};
use tempo::Tempo;

type Task = JoinHandle<Result<(), DeviceError>>;

fn flatten(joined: Result<Result<(), DeviceError>, JoinError>) -> anyhow::Result<()> {
    Ok(joined??)
}

async fn wait_player(player: &mut Option<Task>) -> anyhow::Result<()> {
    match player {
        Some(task) => flatten(task.await),
        None => pending().await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = load_config(&config_path)?;
    let pattern = config.pattern()?;
    let tempo = Arc::new(Tempo::new(config.tempo));
    let voice = Voice {
        channel: config.channel,
        velocity: config.velocity,
    };
    info!(
        "Pattern {} at {} bpm, {:?} playback",
        pattern, tempo, config.playback_mode
    );

    let output = midi::connect_output(config.output_port.as_deref())
        .context("problem accessing MIDI out")?;

    let (events_tx, events_rx) = handoff::channel(config.handoff_capacity);
    let input = midi::connect_input(config.input_port.as_deref(), events_tx)
        .context("problem accessing MIDI in")?;

    let detector = Detector::new(tempo.clone(), config.channel);
    let (mut detecting, mut player): (Task, Option<Task>) = match config.playback_mode {
        PlaybackMode::Inline => {
            let mut handler = InlinePlayer::new(output, tempo.clone(), voice, pattern);
            let detecting =
                tokio::spawn(async move { detector.run(events_rx, &mut handler).await });
            (detecting, None)
        }
        PlaybackMode::Decoupled => {
            let (mut handler, player) =
                playback::spawn_player(output, tempo.clone(), voice, pattern);
            let detecting =
                tokio::spawn(async move { detector.run(events_rx, &mut handler).await });
            (detecting, Some(player))
        }
    };

    console::spawn(tempo.clone(), config.tempo_step);
    println!("Ready to play");

    let outcome = tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
        joined = &mut detecting => flatten(joined),
        result = wait_player(&mut player) => result,
    };

    // The detector has to let go of the channel before the input connection
    // is closed, or a driver blocked on a delivery never returns.
    if let Some(player) = &player {
        player.abort();
    }
    if !detecting.is_finished() {
        detecting.abort();
        let _ = detecting.await;
    }
    drop(input);

    if let Err(e) = &outcome {
        error!("session ended: {e:#}");
    }
    outcome
}
