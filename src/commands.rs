//! Presentation-facing commands and the recorder event loop
//!
//! A front end sends [`Command`]s and watches [`ViewState`] snapshots. The
//! loop in [`Recorder::run`] interleaves commands, capture events and the
//! elapsed-time sampler on a single task; each is handled to completion
//! before the next one is looked at.

use crate::library::catalog::{CatalogEntry, PlaybackSource};
use crate::library::record::RecordId;
use crate::recorder::channel::RecordingResult;
use crate::recorder::quality::QualityTier;
use crate::recorder::session::SessionState;
use crate::recorder::Recorder;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;

#[derive(Debug)]
pub enum Command {
    Start,
    Pause,
    Resume,
    TogglePause,
    Stop,
    SetQuality(QualityTier),
    SetFrameRate(u32),
    Delete(RecordId),
    Play {
        id: RecordId,
        reply: oneshot::Sender<RecordingResult<PlaybackSource>>,
    },
    Download {
        id: RecordId,
        dir: PathBuf,
        reply: oneshot::Sender<RecordingResult<PathBuf>>,
    },
    /// Stop any recording in progress, then leave the loop
    Shutdown,
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub state: SessionState,
    pub elapsed_display: String,
    pub quality: QualityTier,
    pub frame_rate: u32,
    pub frame_rate_options: Vec<u32>,
    pub recordings: Vec<CatalogEntry>,
    pub sampled_at: DateTime<Utc>,
}

impl ViewState {
    pub fn can_start(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn can_pause_or_stop(&self) -> bool {
        self.state.is_active()
    }
}

impl Recorder {
    pub fn view(&self) -> ViewState {
        ViewState {
            state: self.state(),
            elapsed_display: self.elapsed_display(),
            quality: self.quality(),
            frame_rate: self.frame_rate(),
            frame_rate_options: self.frame_rate_options().to_vec(),
            recordings: self.catalog().entries(),
            sampled_at: self.now(),
        }
    }

    /// Handle one command. Returns false when the loop should exit.
    pub async fn dispatch(&mut self, command: Command) -> RecordingResult<bool> {
        tracing::debug!("Command: {:?}", command);
        match command {
            Command::Start => {
                self.start().await?;
            }
            Command::Pause => {
                self.pause();
            }
            Command::Resume => {
                self.resume();
            }
            Command::TogglePause => {
                self.toggle_pause();
            }
            Command::Stop => {
                self.stop()?;
            }
            Command::SetQuality(quality) => self.set_quality(quality),
            Command::SetFrameRate(frame_rate) => {
                self.set_frame_rate(frame_rate);
            }
            Command::Delete(id) => {
                self.delete(id)?;
            }
            Command::Play { id, reply } => {
                let _ = reply.send(self.play(id));
            }
            Command::Download { id, dir, reply } => {
                let _ = reply.send(self.download(id, &dir));
            }
            Command::Shutdown => {
                self.shutdown()?;
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Drive the recorder until `Shutdown` arrives or every sender is gone.
    ///
    /// A fresh [`ViewState`] is published after every command, every capture
    /// event and every sampler tick.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>, view: watch::Sender<ViewState>) {
        let mut sampler = tokio::time::interval(self.sample_interval);
        sampler.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Recorder loop started");
        loop {
            tokio::select! {
                biased;

                Some(event) = self.next_event() => {
                    if let Err(e) = self.handle_event(event) {
                        tracing::warn!("Capture event failed: {}", e);
                    }
                }
                command = commands.recv() => {
                    let command = command.unwrap_or(Command::Shutdown);
                    match self.dispatch(command).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => tracing::warn!("Command failed: {}", e),
                    }
                }
                _ = sampler.tick() => {}
            }
            view.send_replace(self.view());
        }

        view.send_replace(self.view());
        tracing::info!("Recorder loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::synthetic::{SyntheticBackend, SyntheticOptions};
    use crate::config::AppConfig;
    use crate::library::catalog::RecordingCatalog;
    use crate::library::payload::PayloadStore;
    use crate::library::storage::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn recorder(options: SyntheticOptions) -> Recorder {
        let catalog = RecordingCatalog::load(
            Arc::new(MemoryStore::new()),
            Arc::new(PayloadStore::new()),
        )
        .unwrap();
        Recorder::new(
            &AppConfig::default(),
            Arc::new(SyntheticBackend::new(options)),
            catalog,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_records_and_shuts_down() {
        let mut recorder = recorder(SyntheticOptions {
            fragment_size: 100,
            ..Default::default()
        });
        let (tx, rx) = mpsc::channel(8);
        let (view_tx, view_rx) = watch::channel(recorder.view());

        let script = async move {
            tx.send(Command::Start).await.unwrap();
            tokio::time::sleep(Duration::from_millis(2500)).await;
            assert_eq!(view_rx.borrow().state, SessionState::Recording);
            tx.send(Command::TogglePause).await.unwrap();
            tokio::time::sleep(Duration::from_secs(3)).await;
            assert_eq!(view_rx.borrow().state, SessionState::Paused);
            tx.send(Command::TogglePause).await.unwrap();
            tokio::time::sleep(Duration::from_millis(1200)).await;
            tx.send(Command::Stop).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send(Command::Shutdown).await.unwrap();
        };

        tokio::join!(recorder.run(rx, view_tx), script);

        let entries = recorder.catalog().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].metadata.size_bytes, 300);
        assert!(entries[0].playable);
        assert_eq!(recorder.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_handles_platform_end() {
        let mut recorder = recorder(SyntheticOptions {
            fragment_size: 10,
            end_after: Some(Duration::from_millis(3500)),
            ..Default::default()
        });
        let (tx, rx) = mpsc::channel(8);
        let (view_tx, _view_rx) = watch::channel(recorder.view());

        let script = async move {
            tx.send(Command::Start).await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(tx);
        };

        tokio::join!(recorder.run(rx, view_tx), script);

        assert_eq!(recorder.catalog().len(), 1);
        assert_eq!(recorder.catalog().list()[0].metadata().size_bytes, 30);
    }

    #[tokio::test]
    async fn test_play_and_download_reply() {
        let mut recorder = recorder(SyntheticOptions::default());
        recorder.start().await.unwrap();
        let record = recorder.stop().unwrap();
        assert!(record.is_none());

        let (reply, answer) = oneshot::channel();
        assert!(recorder
            .dispatch(Command::Play {
                id: RecordId(1),
                reply
            })
            .await
            .unwrap());
        assert!(answer.await.unwrap().is_err());

        let (reply, answer) = oneshot::channel();
        let dir = tempfile::tempdir().unwrap();
        recorder
            .dispatch(Command::Download {
                id: RecordId(1),
                dir: dir.path().to_path_buf(),
                reply,
            })
            .await
            .unwrap();
        assert!(answer.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_view_reflects_selection() {
        let mut recorder = recorder(SyntheticOptions::default());
        recorder
            .dispatch(Command::SetQuality(QualityTier::FullHd1080))
            .await
            .unwrap();
        recorder.dispatch(Command::SetFrameRate(60)).await.unwrap();

        let view = recorder.view();
        assert_eq!(view.quality, QualityTier::FullHd1080);
        assert_eq!(view.frame_rate, 60);
        assert_eq!(view.frame_rate_options, vec![15, 24, 30, 60]);
        assert_eq!(view.elapsed_display, "00:00");
        assert!(view.can_start());
        assert!(!view.can_pause_or_stop());
    }
}
