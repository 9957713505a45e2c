use std::{collections::HashSet, time::Duration};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::types::{PkceChallenge, TrackRecord};

pub fn generate_code_verifier() -> String {
    random_alphanumeric(128)
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Anti-CSRF token echoed back by the authorization redirect.
pub fn generate_state() -> String {
    random_alphanumeric(32)
}

pub fn generate_pkce_challenge() -> PkceChallenge {
    let code_verifier = generate_code_verifier();
    let code_challenge = generate_code_challenge(&code_verifier);
    PkceChallenge {
        code_verifier,
        code_challenge,
        state: generate_state(),
    }
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Keeps the first record for every track id, preserving order.
pub fn remove_duplicate_tracks(tracks: &mut Vec<TrackRecord>) {
    let mut seen_ids = HashSet::new();
    tracks.retain(|track| seen_ids.insert(track.track_id.clone()));
}

/// Delay before retry number `retry` (0-based): `base * 2^retry`, capped at `max`.
pub fn backoff_delay(base: Duration, retry: u32, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

/// Parses a `Retry-After` header given in whole seconds.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
