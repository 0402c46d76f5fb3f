//! Driver-to-detector event channel.
//!
//! The driver side is synchronous (it runs on the MIDI backend's callback
//! thread) and blocks while the detector is busy. With capacity `0` a
//! delivery only returns once the detector has actually taken the event, so
//! input produced during inline playback stalls the driver until playback
//! ends. Any larger capacity buffers that many pending events instead.

use tokio::sync::{mpsc, oneshot};

use crate::note::NoteEvent;

struct Delivery {
    event: NoteEvent,
    taken: Option<oneshot::Sender<()>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed;

#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Delivery>,
    rendezvous: bool,
}

pub struct EventReceiver {
    rx: mpsc::Receiver<Delivery>,
}

pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventSender {
            tx,
            rendezvous: capacity == 0,
        },
        EventReceiver { rx },
    )
}

impl EventSender {
    /// Blocking delivery for the driver thread. Must not be called from
    /// inside the async runtime.
    pub fn deliver(&self, event: NoteEvent) -> Result<(), Closed> {
        if !self.rendezvous {
            return self
                .tx
                .blocking_send(Delivery { event, taken: None })
                .map_err(|_| Closed);
        }

        let (taken_tx, taken_rx) = oneshot::channel();
        self.tx
            .blocking_send(Delivery {
                event,
                taken: Some(taken_tx),
            })
            .map_err(|_| Closed)?;
        // a dropped receiver still means the slot was consumed
        let _ = taken_rx.blocking_recv();
        Ok(())
    }

    pub async fn send(&self, event: NoteEvent) -> Result<(), Closed> {
        if !self.rendezvous {
            return self
                .tx
                .send(Delivery { event, taken: None })
                .await
                .map_err(|_| Closed);
        }

        let (taken_tx, taken_rx) = oneshot::channel();
        self.tx
            .send(Delivery {
                event,
                taken: Some(taken_tx),
            })
            .await
            .map_err(|_| Closed)?;
        let _ = taken_rx.await;
        Ok(())
    }
}

impl EventReceiver {
    /// Next event, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<NoteEvent> {
        let delivery = self.rx.recv().await?;
        if let Some(taken) = delivery.taken {
            let _ = taken.send(());
        }
        Some(delivery.event)
    }
}
