use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::borrow::Cow;
use std::time::{Duration, Instant};

/// How long a glitch burst lasts
pub const GLITCH_DURATION: Duration = Duration::from_millis(200);

const MIN_GLITCH_GAP_MS: u64 = 5_000;
const MAX_GLITCH_GAP_MS: u64 = 15_000;

const GLITCH_SYMBOLS: [char; 8] = ['#', '%', '&', '@', '/', '\\', '|', '_'];

/// Periodic glitch on headings: a short burst at a random interval
#[derive(Debug, Clone)]
pub struct GlitchEffect {
    next_at: Instant,
    active_until: Option<Instant>,
    /// Picks the scrambled characters; fixed for the length of a burst
    seed: u64,
}

impl GlitchEffect {
    pub fn new(now: Instant) -> Self {
        Self {
            next_at: now + random_gap(),
            active_until: None,
            seed: 0,
        }
    }

    /// Advance to `now`. Returns true if the visible state changed.
    pub fn update(&mut self, now: Instant) -> bool {
        match self.active_until {
            Some(until) if now >= until => {
                self.active_until = None;
                true
            }
            Some(_) => false,
            None if now >= self.next_at => {
                self.active_until = Some(now + GLITCH_DURATION);
                self.next_at = now + random_gap();
                self.seed = rand::thread_rng().gen();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_until.is_some()
    }

    /// `text` as it should be drawn right now. Redraws within one burst
    /// scramble the same characters.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !self.is_active() {
            return Cow::Borrowed(text);
        }
        Cow::Owned(glitch_text(text, &mut StdRng::seed_from_u64(self.seed)))
    }
}

fn random_gap() -> Duration {
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(MIN_GLITCH_GAP_MS..MAX_GLITCH_GAP_MS))
}

/// Scramble roughly a quarter of the visible characters of `text`
pub fn glitch_text<R: Rng>(text: &str, rng: &mut R) -> String {
    text.chars()
        .map(|c| {
            if !c.is_whitespace() && rng.gen_ratio(1, 4) {
                *GLITCH_SYMBOLS.choose(rng).unwrap_or(&c)
            } else {
                c
            }
        })
        .collect()
}
