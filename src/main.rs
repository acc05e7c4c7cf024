use anyhow::Result;
use clap::Parser;
use dyad_rating::console;
use dyad_rating::storage::RATINGS_FILE_NAME;
use dyad_rating::{
    prepare_session_dir, Config, CsvAppender, PointerSource, SessionRunner, SimulatedPlayback,
    RATINGS_HEADER,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(name = "dyad-rating")]
#[command(about = "Continuous valence rating of a recorded conversation")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/dyad-rating")]
    config: String,

    /// Length of the simulated video in seconds
    #[arg(long, default_value = "600")]
    video_secs: u64,

    /// Playback speed multiplier
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Output root (overrides storage.output_root)
    #[arg(short, long)]
    output_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Participant {} (partner {}, dyad {}, {} computer)",
        cfg.participant.participant_id,
        cfg.participant.partner_id,
        cfg.participant.dyad_id,
        cfg.participant.computer
    );

    let output_root = match args.output_dir {
        Some(dir) => PathBuf::from(shellexpand::tilde(&dir).into_owned()),
        None => cfg.storage.output_root(),
    };
    let session_dir = prepare_session_dir(&output_root, &cfg.participant).await?;
    let ratings_path = session_dir.join(RATINGS_FILE_NAME);
    info!("Ratings file: {}", ratings_path.display());

    let playback = SimulatedPlayback::new(Duration::from_secs(args.video_secs), args.speed);
    let pointer = PointerSource::new(100.0);
    let pointer_handle = pointer.handle();

    let session_config = cfg.task.session_config()?;
    let (event_tx, event_rx) = mpsc::channel(64);
    let (runner, mut notices) = SessionRunner::new(
        session_config,
        cfg.participant.clone(),
        Box::new(pointer),
        Box::new(playback.clone()),
        Arc::new(CsvAppender::with_header(RATINGS_HEADER)),
        ratings_path,
    );

    let media_task = playback.spawn_media_events(event_tx.clone(), Duration::from_millis(250));
    console::spawn_stdin_reader(event_tx, pointer_handle);

    let printer = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            println!("\n{}", console::render_notice(&notice));
        }
    });

    let stats = runner.run(event_rx).await?;
    media_task.abort();
    printer.await?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
