//! Seed strings, their stable numeric hash, and the run RNG built from it.

use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Longest explicit seed accepted, in characters.
pub const MAX_SEED_LEN: usize = 64;

const ADJECTIVES: [&str; 32] = [
    "amber", "ashen", "bitter", "bright", "broken", "cinder", "cold", "crimson", "deep", "dusky",
    "ember", "faded", "feral", "gilded", "hollow", "iron", "lost", "mossy", "narrow", "pale",
    "quiet", "rusted", "salt", "silent", "sunken", "tangled", "umber", "verdant", "wild",
    "winding", "woven", "young",
];

const NOUNS: [&str; 32] = [
    "anvil", "badger", "beacon", "bramble", "cavern", "cellar", "chasm", "crow", "delve",
    "falcon", "furnace", "grotto", "hearth", "heron", "lantern", "ledger", "marrow", "mine",
    "otter", "quarry", "raven", "root", "shaft", "spire", "tunnel", "vault", "vein", "warren",
    "well", "willow", "wren", "yard",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedOrigin {
    Explicit,
    Generated,
}

/// The seed a run actually used, in both its shareable and numeric forms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSeed {
    pub text: String,
    pub value: u64,
    pub origin: SeedOrigin,
}

impl ResolvedSeed {
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.value)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedDerivationError {
    #[error("seed must contain a visible character")]
    Blank,
    #[error("seed is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("seed contains a control character at position {index}")]
    ControlCharacter { index: usize },
}

/// Uses `explicit` verbatim when it is non-empty, otherwise synthesizes a new seed string.
pub fn resolve_seed(explicit: Option<&str>) -> Result<ResolvedSeed, SeedDerivationError> {
    match explicit.filter(|text| !text.is_empty()) {
        Some(text) => {
            validate_seed_text(text)?;
            Ok(ResolvedSeed {
                text: text.to_string(),
                value: seed_value(text),
                origin: SeedOrigin::Explicit,
            })
        }
        None => Ok(generated_seed()),
    }
}

pub(crate) fn generated_seed() -> ResolvedSeed {
    let text = generate_seed_text();
    ResolvedSeed { value: seed_value(&text), text, origin: SeedOrigin::Generated }
}

/// Stable hash of a seed string; identical on every platform and locale.
pub fn seed_value(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

fn validate_seed_text(text: &str) -> Result<(), SeedDerivationError> {
    if text.trim().is_empty() {
        return Err(SeedDerivationError::Blank);
    }
    let len = text.chars().count();
    if len > MAX_SEED_LEN {
        return Err(SeedDerivationError::TooLong { len, max: MAX_SEED_LEN });
    }
    if let Some(index) = text.chars().position(char::is_control) {
        return Err(SeedDerivationError::ControlCharacter { index });
    }
    Ok(())
}

static GENERATED_SEED_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Builds an `adjective-noun-NNNN` seed from runtime entropy.
pub fn generate_seed_text() -> String {
    let now_nanos =
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0_u128, |duration| duration.as_nanos());
    let pid = u64::from(process::id());
    let counter = GENERATED_SEED_COUNTER.fetch_add(1, Ordering::Relaxed);

    let entropy = (now_nanos as u64)
        ^ ((now_nanos >> 64) as u64)
        ^ pid.rotate_left(17)
        ^ counter.rotate_left(7);

    seed_text_from_entropy(mix_seed(entropy))
}

fn seed_text_from_entropy(entropy: u64) -> String {
    let adjective = ADJECTIVES[(mix_seed_stream(entropy, 1) % ADJECTIVES.len() as u64) as usize];
    let noun = NOUNS[(mix_seed_stream(entropy, 2) % NOUNS.len() as u64) as usize];
    let number = mix_seed_stream(entropy, 3) % 10_000;
    format!("{adjective}-{noun}-{number:04}")
}

fn mix_seed_stream(seed: u64, stream: u64) -> u64 {
    let mut mixed = seed ^ stream.wrapping_mul(0xD6E8_FD9A_5B89_7A4D);
    mixed ^= mixed >> 33;
    mixed = mixed.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    mixed ^= mixed >> 33;
    mixed = mixed.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    mixed ^ (mixed >> 33)
}

fn mix_seed(mut value: u64) -> u64 {
    value ^= value >> 30;
    value = value.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    value ^= value >> 27;
    value = value.wrapping_mul(0x94D0_49BB_1331_11EB);
    value ^ (value >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::Rng;

    #[test]
    fn explicit_seed_is_used_verbatim() {
        let resolved = resolve_seed(Some("  Lantern Delve ")).expect("seed with spaces is fine");
        assert_eq!(resolved.text, "  Lantern Delve ");
        assert_eq!(resolved.origin, SeedOrigin::Explicit);
        assert_eq!(resolved.value, seed_value("  Lantern Delve "));
    }

    #[test]
    fn seed_value_is_stable_and_sensitive() {
        assert_eq!(seed_value("amber-falcon-0042"), seed_value("amber-falcon-0042"));
        assert_ne!(seed_value("amber-falcon-0042"), seed_value("amber-falcon-0043"));
        assert_ne!(seed_value("abc"), seed_value("ABC"));
    }

    #[test]
    fn empty_or_missing_seed_is_generated() {
        for explicit in [None, Some("")] {
            let resolved = resolve_seed(explicit).expect("generation never fails");
            assert_eq!(resolved.origin, SeedOrigin::Generated);
            assert!(!resolved.text.is_empty());
            assert_eq!(resolved.value, seed_value(&resolved.text));
        }
    }

    #[test]
    fn generated_seed_text_has_three_dash_separated_parts() {
        let text = generate_seed_text();
        let parts: Vec<&str> = text.split('-').collect();
        assert_eq!(parts.len(), 3, "unexpected seed shape: {text}");
        assert!(ADJECTIVES.contains(&parts[0]));
        assert!(NOUNS.contains(&parts[1]));
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn seed_text_depends_only_on_entropy() {
        assert_eq!(seed_text_from_entropy(77), seed_text_from_entropy(77));
    }

    #[test]
    fn malformed_seeds_are_rejected() {
        assert_eq!(resolve_seed(Some("   ")), Err(SeedDerivationError::Blank));
        assert_eq!(
            resolve_seed(Some("ab\u{7}c")),
            Err(SeedDerivationError::ControlCharacter { index: 2 })
        );
        let long = "x".repeat(MAX_SEED_LEN + 1);
        assert_eq!(
            resolve_seed(Some(&long)),
            Err(SeedDerivationError::TooLong { len: MAX_SEED_LEN + 1, max: MAX_SEED_LEN })
        );
    }

    #[test]
    fn same_seed_yields_same_rng_stream() {
        let seed = resolve_seed(Some("quiet-heron-1234")).unwrap();
        let mut left = seed.rng();
        let mut right = seed.rng();
        for _ in 0..16 {
            assert_eq!(left.next_u64(), right.next_u64());
        }
    }
}
