use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::{sleep, Duration};

pub const MIN_BPM: u32 = 30;
pub const MAX_BPM: u32 = 300;
pub const DEFAULT_BPM: u32 = 100;

// Slack on top of one beat so a human tap doesn't have to be exactly on time.
const TIMEOUT_BEATS: f64 = 2.2;

/// Process-wide tempo in beats per minute, always within `MIN_BPM..=MAX_BPM`.
///
/// One writer (the tempo console) and several readers (detector, player).
/// Values are re-read on every use, so a change lands on the next beat.
#[derive(Debug)]
pub struct Tempo {
    bpm: AtomicU32,
}

impl Tempo {
    pub fn new(bpm: u32) -> Self {
        Self {
            bpm: AtomicU32::new(bpm.clamp(MIN_BPM, MAX_BPM)),
        }
    }

    pub fn current(&self) -> u32 {
        self.bpm.load(Ordering::Relaxed)
    }

    /// Moves the tempo by `delta` BPM, silently stopping at the limits.
    pub fn adjust(&self, delta: i32) -> u32 {
        let clamp = |bpm: u32| {
            (bpm as i64 + delta as i64).clamp(MIN_BPM as i64, MAX_BPM as i64) as u32
        };
        // the closure never returns None, so both arms carry the previous value
        let previous = match self
            .bpm
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bpm| Some(clamp(bpm)))
        {
            Ok(prev) | Err(prev) => prev,
        };
        clamp(previous)
    }

    pub fn increase(&self, step: u32) -> u32 {
        self.adjust(step.min(i32::MAX as u32) as i32)
    }

    pub fn decrease(&self, step: u32) -> u32 {
        self.adjust(-(step.min(i32::MAX as u32) as i32))
    }

    pub fn beat_delay(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.current() as f64)
    }

    /// How long the gesture detector waits in an armed state.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.current() as f64 * TIMEOUT_BEATS)
    }

    pub async fn wait_one_beat(&self) {
        sleep(self.beat_delay()).await;
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.current())
    }
}
