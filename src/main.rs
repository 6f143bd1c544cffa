//! Demo driver: records a few seconds from the synthetic backend, pausing in
//! between, then lists the library and downloads the newest recording.

use anyhow::Context;
use open_screenrec_lib::capture::{SyntheticBackend, SyntheticOptions};
use open_screenrec_lib::library::{FileStore, PayloadStore, RecordingCatalog};
use open_screenrec_lib::{init_tracing, AppConfig, Command, Recorder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    init_tracing(&config.log_filter);

    tracing::info!("Starting Open ScreenRec v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(FileStore::new(&config.storage_dir));
    let catalog = RecordingCatalog::load(store, Arc::new(PayloadStore::new()))
        .context("loading recording catalog")?;
    let backend = Arc::new(SyntheticBackend::new(SyntheticOptions::default()));
    let mut recorder = Recorder::new(&config, backend, catalog);

    let (commands, command_rx) = mpsc::channel(16);
    let (view_tx, view_rx) = watch::channel(recorder.view());

    let script = async move {
        let steps = [
            (Command::Start, Duration::from_secs(3)),
            (Command::Pause, Duration::from_secs(2)),
            (Command::Resume, Duration::from_secs(2)),
            (Command::Stop, Duration::from_millis(100)),
        ];
        for (command, wait) in steps {
            if commands.send(command).await.is_err() {
                return;
            }
            tokio::time::sleep(wait).await;
            let view = view_rx.borrow().clone();
            tracing::info!("{:?} {}", view.state, view.elapsed_display);
        }
        let _ = commands.send(Command::Shutdown).await;
    };

    tokio::join!(recorder.run(command_rx, view_tx), script);

    let entries = recorder.catalog().entries();
    println!("{}", serde_json::to_string_pretty(&entries)?);

    if let Some(newest) = entries.iter().find(|e| e.playable) {
        let dir = config.storage_dir.join("downloads");
        let path = recorder
            .download(newest.metadata.id, &dir)
            .context("downloading newest recording")?;
        println!("Saved {}", path.display());
    }

    Ok(())
}
