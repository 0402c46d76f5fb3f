use std::sync::Arc;

use log::{debug, error};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::DeviceError;
use crate::gesture::TriggerHandler;
use crate::note::{note_name, note_off, note_on, transpose};
use crate::pattern::Pattern;
use crate::tempo::Tempo;

/// Somewhere raw three-byte MIDI messages can be written.
pub trait OutputSink {
    fn send(&mut self, message: &[u8; 3]) -> Result<(), DeviceError>;
}

/// Fixed channel and velocity for everything the player emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voice {
    pub channel: u8,
    pub velocity: u8,
}

/// Plays `pattern` transposed onto `base`, one note per beat.
///
/// Starts with a note off for `base` and a beat of silence. Stops at the
/// first failed send; a note that was already switched on is left sounding.
pub async fn play<S>(
    out: &mut S,
    tempo: &Tempo,
    voice: Voice,
    base: u8,
    pattern: &Pattern,
) -> Result<(), DeviceError>
where
    S: OutputSink + Send,
{
    out.send(&note_off(voice.channel, base))?;
    tempo.wait_one_beat().await;

    for &interval in pattern.intervals() {
        let note = transpose(base, interval);
        out.send(&note_on(voice.channel, note, voice.velocity))?;
        tempo.wait_one_beat().await;
        out.send(&note_off(voice.channel, note))?;
    }
    Ok(())
}

/// Plays on the detector's own task: no gesture is recognised until the
/// pattern has finished.
pub struct InlinePlayer<S> {
    out: S,
    tempo: Arc<Tempo>,
    voice: Voice,
    pattern: Pattern,
}

impl<S: OutputSink + Send> InlinePlayer<S> {
    pub fn new(out: S, tempo: Arc<Tempo>, voice: Voice, pattern: Pattern) -> Self {
        Self {
            out,
            tempo,
            voice,
            pattern,
        }
    }
}

impl<S: OutputSink + Send> TriggerHandler for InlinePlayer<S> {
    async fn on_trigger(&mut self, pitch: u8) -> Result<(), DeviceError> {
        debug!("playing {} on {}", self.pattern, note_name(pitch));
        play(&mut self.out, &self.tempo, self.voice, pitch, &self.pattern)
            .await
            .inspect_err(|e| error!("playback issue: {e}"))
    }
}

/// Hands triggers to a separate player task. Holds at most one pending
/// trigger; anything arriving while that slot is full is dropped.
pub struct QueuedPlayer {
    tx: mpsc::Sender<u8>,
}

impl TriggerHandler for QueuedPlayer {
    async fn on_trigger(&mut self, pitch: u8) -> Result<(), DeviceError> {
        match self.tx.try_send(pitch) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(pitch)) => {
                debug!("player busy, dropping trigger on {}", note_name(pitch));
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DeviceError::PlayerStopped),
        }
    }
}

/// Starts a player task fed by the returned handler. The task ends when the
/// handler is dropped or a send fails.
pub fn spawn_player<S>(
    mut out: S,
    tempo: Arc<Tempo>,
    voice: Voice,
    pattern: Pattern,
) -> (QueuedPlayer, JoinHandle<Result<(), DeviceError>>)
where
    S: OutputSink + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<u8>(1);
    let task = tokio::spawn(async move {
        while let Some(pitch) = rx.recv().await {
            debug!("playing {} on {}", pattern, note_name(pitch));
            play(&mut out, &tempo, voice, pitch, &pattern)
                .await
                .inspect_err(|e| error!("playback issue: {e}"))?;
        }
        Ok(())
    });
    (QueuedPlayer { tx }, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{self, Interval};
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration, Instant};

    const VOICE: Voice = Voice {
        channel: 0,
        velocity: 80,
    };

    #[derive(Clone, Default)]
    struct Recording {
        sent: Arc<Mutex<Vec<(Instant, [u8; 3])>>>,
        fail_after: Option<usize>,
    }

    impl Recording {
        fn failing_after(n: usize) -> Self {
            Self {
                fail_after: Some(n),
                ..Self::default()
            }
        }

        fn messages(&self) -> Vec<[u8; 3]> {
            self.sent.lock().unwrap().iter().map(|(_, m)| *m).collect()
        }

        fn times(&self) -> Vec<Instant> {
            self.sent.lock().unwrap().iter().map(|(t, _)| *t).collect()
        }
    }

    impl OutputSink for Recording {
        fn send(&mut self, message: &[u8; 3]) -> Result<(), DeviceError> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_after.is_some_and(|n| sent.len() >= n) {
                return Err(DeviceError::Send {
                    message: *message,
                    reason: "device unplugged".to_owned(),
                });
            }
            sent.push((Instant::now(), *message));
            Ok(())
        }
    }

    fn expected_for(base: u8, steps: &[u8]) -> Vec<[u8; 3]> {
        let mut expected = vec![note_off(0, base)];
        for &note in steps {
            expected.push(note_on(0, note, 80));
            expected.push(note_off(0, note));
        }
        expected
    }

    fn assert_close(actual: Duration, expected: Duration) {
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        assert!(
            diff <= Duration::from_millis(1),
            "{actual:?} vs {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn plays_arpeggio_in_order_one_beat_apart() {
        let tempo = Tempo::new(120);
        let pattern = pattern::select(pattern::DEFAULT_PATTERN).unwrap();
        let mut out = Recording::default();

        let start = Instant::now();
        play(&mut out, &tempo, VOICE, 60, &pattern).await.unwrap();

        assert_eq!(
            out.messages(),
            expected_for(60, &[60, 64, 67, 72, 67, 64, 60])
        );

        let times = out.times();
        let beat = tempo.beat_delay();
        // off(base) -> first on is a beat, each on -> off is a beat,
        // each later off -> next on is immediate
        for (i, pair) in times.windows(2).enumerate() {
            let gap = pair[1] - pair[0];
            if i == 0 || i % 2 == 1 {
                assert_close(gap, beat);
            } else {
                assert_close(gap, Duration::ZERO);
            }
        }
        assert_close(start.elapsed(), beat * (pattern.len() as u32 + 1));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_pattern_only_silences_base() {
        let tempo = Tempo::new(60);
        let mut out = Recording::default();
        play(&mut out, &tempo, VOICE, 62, &Pattern::new(vec![]))
            .await
            .unwrap();
        assert_eq!(out.messages(), vec![note_off(0, 62)]);
    }

    #[tokio::test(start_paused = true)]
    async fn uses_configured_voice() {
        let tempo = Tempo::new(300);
        let mut out = Recording::default();
        let voice = Voice {
            channel: 5,
            velocity: 33,
        };
        let pattern = Pattern::new(vec![Interval::new(-3)]);
        play(&mut out, &tempo, voice, 60, &pattern).await.unwrap();
        assert_eq!(
            out.messages(),
            vec![note_off(5, 60), note_on(5, 57, 33), note_off(5, 57)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tempo_change_lands_on_next_beat() {
        let tempo = Arc::new(Tempo::new(60));
        let mut out = Recording::default();
        let pattern = Pattern::new(vec![Interval::UNISON, Interval::OCTAVE]);

        let dial = tempo.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(1500)).await;
            dial.adjust(60);
        });
        play(&mut out, &tempo, VOICE, 48, &pattern).await.unwrap();

        let times = out.times();
        assert_close(times[1] - times[0], Duration::from_secs(1));
        // the beat in progress at the change keeps its length
        assert_close(times[2] - times[1], Duration::from_secs(1));
        assert_close(times[4] - times[3], Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn first_failed_send_aborts() {
        let tempo = Tempo::new(120);
        let pattern = pattern::select(pattern::DEFAULT_PATTERN).unwrap();
        let mut out = Recording::failing_after(4);

        let result = play(&mut out, &tempo, VOICE, 60, &pattern).await;
        assert!(matches!(result, Err(DeviceError::Send { .. })));
        // off(60), on(60), off(60), on(64) got out; off(64) failed
        assert_eq!(out.messages(), expected_for(60, &[60, 64])[..4].to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn inline_player_propagates_failure() {
        let tempo = Arc::new(Tempo::new(120));
        let pattern = Pattern::new(vec![Interval::UNISON]);
        let mut player = InlinePlayer::new(Recording::failing_after(0), tempo, VOICE, pattern);
        assert!(player.on_trigger(60).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn queued_player_drops_triggers_while_busy() {
        let tempo = Arc::new(Tempo::new(120));
        let pattern = Pattern::new(vec![Interval::UNISON, Interval::FIFTH]);
        let out = Recording::default();
        let (mut handler, task) = spawn_player(out.clone(), tempo, VOICE, pattern);

        handler.on_trigger(60).await.unwrap();
        // let the player pick up the first trigger
        sleep(Duration::from_millis(10)).await;
        handler.on_trigger(62).await.unwrap();
        handler.on_trigger(64).await.unwrap();
        drop(handler);

        task.await.unwrap().unwrap();
        let mut expected = expected_for(60, &[60, 67]);
        expected.extend(expected_for(62, &[62, 69]));
        assert_eq!(out.messages(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_player_reports_stopped_player() {
        let tempo = Arc::new(Tempo::new(120));
        let pattern = Pattern::new(vec![Interval::UNISON]);
        let (mut handler, task) =
            spawn_player(Recording::failing_after(0), tempo, VOICE, pattern);

        handler.on_trigger(60).await.unwrap();
        assert!(matches!(task.await.unwrap(), Err(DeviceError::Send { .. })));
        assert!(matches!(
            handler.on_trigger(62).await,
            Err(DeviceError::PlayerStopped)
        ));
    }
}
