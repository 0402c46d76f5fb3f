//! Double-tap gesture detection.
//!
//! Press a note, release it, press a second note and release that one, each
//! step within the tempo-derived timeout. The second pitch is the trigger.

use std::future::Future;
use std::sync::Arc;

use log::{debug, trace};
use tokio::time::{timeout_at, Instant};

use crate::error::DeviceError;
use crate::handoff::EventReceiver;
use crate::note::{note_name, NoteEvent, NoteKind};
use crate::tempo::Tempo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    FirstDown { first: u8 },
    FirstUp { first: u8 },
    SecondDown { first: u8, second: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Event(NoteEvent),
    Timeout,
}

impl GestureState {
    /// Whether a timeout runs while in this state.
    pub fn is_armed(self) -> bool {
        self != GestureState::Idle
    }

    /// Applies one input. Returns the next state and, when the gesture
    /// completes, the pitch to trigger on.
    ///
    /// Events on other channels, and releases of a pitch other than the one
    /// held, leave the state untouched.
    pub fn step(self, input: Input, channel: u8) -> (GestureState, Option<u8>) {
        use GestureState::*;

        let event = match input {
            Input::Timeout => return (Idle, None),
            Input::Event(event) if event.channel == channel => event,
            Input::Event(_) => return (self, None),
        };

        match (self, event.kind) {
            (Idle, NoteKind::Start) => (FirstDown { first: event.pitch }, None),
            (FirstDown { first }, NoteKind::End) if event.pitch == first => {
                (FirstUp { first }, None)
            }
            (FirstUp { first }, NoteKind::Start) => (
                SecondDown {
                    first,
                    second: event.pitch,
                },
                None,
            ),
            (SecondDown { second, .. }, NoteKind::End) if event.pitch == second => {
                (Idle, Some(second))
            }
            (state, _) => (state, None),
        }
    }
}

/// Receives the pitch of every completed gesture.
///
/// The detector awaits the returned future before it takes the next event,
/// so a handler that plays inline holds up detection for its whole duration.
pub trait TriggerHandler {
    fn on_trigger(&mut self, pitch: u8) -> impl Future<Output = Result<(), DeviceError>> + Send;
}

pub struct Detector {
    tempo: Arc<Tempo>,
    channel: u8,
}

impl Detector {
    pub fn new(tempo: Arc<Tempo>, channel: u8) -> Self {
        Self { tempo, channel }
    }

    /// Consumes events until the stream closes.
    ///
    /// The only error is one returned by `handler`; timeouts and stray
    /// events just reset or leave the state machine alone.
    pub async fn run<H>(&self, mut events: EventReceiver, handler: &mut H) -> Result<(), DeviceError>
    where
        H: TriggerHandler + Send,
    {
        let mut state = GestureState::Idle;
        let mut deadline: Option<Instant> = None;

        loop {
            let input = match deadline {
                None => match events.recv().await {
                    Some(event) => Input::Event(event),
                    None => break,
                },
                Some(at) => match timeout_at(at, events.recv()).await {
                    Ok(Some(event)) => Input::Event(event),
                    Ok(None) => break,
                    Err(_) => Input::Timeout,
                },
            };

            let (next, trigger) = state.step(input, self.channel);
            if next != state {
                debug!("gesture {:?} -> {:?}", state, next);
                // timeout is re-read from the tempo on every state entry
                deadline = next
                    .is_armed()
                    .then(|| Instant::now() + self.tempo.timeout());
            } else if let Input::Event(event) = input {
                trace!("ignoring {:?} in {:?}", event, state);
            }
            state = next;

            if let Some(pitch) = trigger {
                debug!("gesture complete on {} ({})", note_name(pitch), pitch);
                handler.on_trigger(pitch).await?;
            }
        }

        debug!("event stream closed in {:?}", state);
        Ok(())
    }
}
