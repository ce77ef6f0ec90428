//! Meditation catalogue and micro-reset prompts.

const MEDITATIONS: &[&str] = &[
    "Morning Meditation",
    "Stress Relief",
    "Focus Boost",
    "Sleep Aid",
    "Anxiety Relief",
];

const MICRO_RESET_PROMPTS: &[&str] = &[
    "Take a deep breath in... and out...",
    "Feel your body relax with each breath",
    "Let go of any tension you're holding",
    "Center yourself in this moment",
    "Busy morning? Take 60 seconds to breathe",
    "Feeling stressed? Try a quick reset",
];

pub fn meditations() -> &'static [&'static str] {
    MEDITATIONS
}

/// Picks a prompt from `seed`; callers choose the rotation source (e.g. the
/// current minute) so selection stays deterministic under test.
pub fn micro_reset_prompt(seed: u64) -> &'static str {
    let index = (seed % MICRO_RESET_PROMPTS.len() as u64) as usize;
    MICRO_RESET_PROMPTS[index]
}
