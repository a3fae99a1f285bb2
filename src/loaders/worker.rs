use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use super::gltf::{load_asset, LoadProgress, LoadedModel};
use crate::error::LoadError;
use crate::session::SessionToken;

/// Messages from the loader thread back to the event-loop thread
#[derive(Debug)]
pub enum LoadEvent {
    Progress(LoadProgress),
    Finished(Result<LoadedModel, LoadError>),
}

/// Destination for loader messages; returns false once nobody is listening
pub trait LoadSink: Send + 'static {
    fn deliver(&self, event: LoadEvent) -> bool;
}

impl LoadSink for Sender<LoadEvent> {
    fn deliver(&self, event: LoadEvent) -> bool {
        self.send(event).is_ok()
    }
}

/// Reads and decodes `path` on a worker thread.
///
/// Nothing is delivered once `token` is deactivated; the session re-checks
/// the token on delivery since deactivation may race with the last send.
pub fn spawn_load(
    path: PathBuf,
    token: SessionToken,
    sink: impl LoadSink,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("asset-loader".to_string())
        .spawn(move || {
            let result = load_asset(&path, |progress| {
                if token.is_active() {
                    sink.deliver(LoadEvent::Progress(progress));
                }
            });

            if !token.is_active() {
                log::debug!("Session ended before {:?} finished loading", path);
                return;
            }
            if !sink.deliver(LoadEvent::Finished(result)) {
                log::debug!("Load result for {:?} had no receiver", path);
            }
        })
}
