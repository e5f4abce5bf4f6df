use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Words from vogon poetry used as the first half of a container name.
pub const VOGON_DESCRIPTORS: &[&str] = &[
    "freddled", "plurdled", "lurgid", "mordious", "earted", "grumbling", "rancid",
    "festering", "confectious", "jurpling", "slayjid", "slurping", "jowling", "meated",
    "foonting", "hooptious", "crinkly", "ravenous",
];

/// Words from vogon poetry used as the second half of a container name.
pub const VOGON_NOUNS: &[&str] = &[
    "gobberwart", "blurglecruncheon", "bindlewurdle", "mashurbitrie", "glupule",
    "gruntbuggly", "micturation", "gabbleblotchit", "jurtle", "organsquealer",
    "agrocrustle", "axlegrurt", "liverslime", "turlingdrome", "dentrassis", "jeltz",
    "jennings", "bureaucrat", "prostetnic", "bugblatter", "kwaltz",
];

/// Generates `descriptor_noun` container names.
///
/// Names are not unique; the runtime rejects a duplicate and the caller decides
/// whether to draw again.
pub struct NameGenerator {
    rng: StdRng,
}

impl NameGenerator {
    /// Seed once from the high-resolution clock.
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::seeded(nanos ^ u64::from(std::process::id()))
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_name(&mut self) -> String {
        // Both lists are non-empty constants.
        let descriptor = VOGON_DESCRIPTORS.choose(&mut self.rng).copied().unwrap_or("lurgid");
        let noun = VOGON_NOUNS.choose(&mut self.rng).copied().unwrap_or("jeltz");
        format!("{}_{}", descriptor, noun)
    }
}
