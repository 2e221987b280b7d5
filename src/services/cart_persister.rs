use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn, Instrument};

use crate::repositories::CartStorage;

enum PersistCommand {
    Save { version: u64, payload: String },
    Flush(oneshot::Sender<()>),
}

/// Single writer for one storage key.
///
/// Snapshots are queued with a version number. The writer task coalesces
/// whatever is queued, writes only the newest snapshot and never writes a
/// version older than one it already wrote. Write failures are logged and
/// dropped.
pub struct CartPersister {
    sender: mpsc::UnboundedSender<PersistCommand>,
}

impl CartPersister {
    pub fn spawn(storage: Arc<dyn CartStorage>, key: String) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let span = tracing::info_span!("cart_persister", key = %key);
        tokio::spawn(run_writer(storage, key, receiver).instrument(span));

        Self { sender }
    }

    /// Queue a serialized snapshot for writing
    pub fn enqueue(&self, version: u64, payload: String) {
        if self
            .sender
            .send(PersistCommand::Save { version, payload })
            .is_err()
        {
            warn!(version = version, "Cart writer has stopped, snapshot dropped");
        }
    }

    /// Wait until every snapshot queued before this call has been handled
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(PersistCommand::Flush(ack)).is_err() {
            return;
        }
        let _ = done.await;
    }
}

async fn run_writer(
    storage: Arc<dyn CartStorage>,
    key: String,
    mut receiver: mpsc::UnboundedReceiver<PersistCommand>,
) {
    let mut last_written: Option<u64> = None;

    while let Some(command) = receiver.recv().await {
        let mut newest: Option<(u64, String)> = None;
        let mut acks = Vec::new();

        absorb(command, &mut newest, &mut acks);
        while let Ok(command) = receiver.try_recv() {
            absorb(command, &mut newest, &mut acks);
        }

        if let Some((version, payload)) = newest {
            if last_written.map_or(true, |written| version > written) {
                match storage.save(&key, &payload).await {
                    Ok(()) => {
                        debug!(version = version, "Cart snapshot written");
                        last_written = Some(version);
                    }
                    Err(e) => {
                        warn!(version = version, error = %e, "Failed to persist cart");
                    }
                }
            } else {
                debug!(version = version, "Skipping stale cart snapshot");
            }
        }

        for ack in acks {
            let _ = ack.send(());
        }
    }

    debug!("Cart writer stopped");
}

fn absorb(
    command: PersistCommand,
    newest: &mut Option<(u64, String)>,
    acks: &mut Vec<oneshot::Sender<()>>,
) {
    match command {
        PersistCommand::Save { version, payload } => {
            if newest.as_ref().map_or(true, |(current, _)| version > *current) {
                *newest = Some((version, payload));
            }
        }
        PersistCommand::Flush(ack) => acks.push(ack),
    }
}
