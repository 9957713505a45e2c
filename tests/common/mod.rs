#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::Router;
use chrono::Utc;
use serde_json::{Value, json};
use tastegenome::{
    config::{AuthConfig, RetryPolicy},
    management::MemoryTokenStore,
    ratelimit::RateLimiter,
    spotify::{Authenticator, SpotifyClient},
    types::{SourceTag, TokenBundle, TrackRecord},
};
use tokio::net::TcpListener;

// Serves `app` on an ephemeral local port and returns its base URL
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

// Request counter shared between a fake endpoint and the test body
#[derive(Clone, Default)]
pub struct Hits(Arc<Mutex<HashMap<String, usize>>>);

impl Hits {
    pub fn hit(&self, key: &str) {
        *self.0.lock().unwrap().entry(key.to_string()).or_default() += 1;
    }

    pub fn get(&self, key: &str) -> usize {
        self.0.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.lock().unwrap().values().sum()
    }
}

// Helper function to create a Spotify track object
pub fn track_json(id: &str, artists: &[&str]) -> Value {
    json!({
        "id": id,
        "name": format!("Song {}", id),
        "artists": artists.iter().map(|a| json!({ "id": format!("{}_id", a), "name": a })).collect::<Vec<_>>(),
        "album": { "id": format!("{}_album", id), "name": format!("Album {}", id) },
        "duration_ms": 180000,
        "popularity": 42
    })
}

// Helper function to create an audio features object as returned by Spotify
pub fn features_json(id: &str) -> Value {
    json!({
        "id": id,
        "type": "audio_features",
        "uri": format!("spotify:track:{}", id),
        "tempo": 120.5,
        "key": 5,
        "mode": 1,
        "energy": 0.8,
        "valence": 0.6,
        "danceability": 0.7,
        "acousticness": 0.1,
        "instrumentalness": 0.0,
        "loudness": -5.2,
        "speechiness": 0.04,
        "liveness": 0.12,
        "time_signature": 4,
        "duration_ms": 180000
    })
}

// Helper function to create a track record without timestamps or features
pub fn record(id: &str, source: SourceTag, artists: &[&str]) -> TrackRecord {
    TrackRecord {
        track_id: id.to_string(),
        name: format!("Song {}", id),
        artists: artists.iter().map(|a| a.to_string()).collect(),
        album_name: format!("Album {}", id),
        duration_ms: 180000,
        source,
        played_at: None,
        added_at: None,
        audio_features: None,
    }
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        min_interval: Duration::ZERO,
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        max_retry_after: Duration::from_secs(1),
    }
}

pub fn bundle_expiring_in(access_token: &str, secs: i64) -> TokenBundle {
    TokenBundle {
        access_token: access_token.to_string(),
        refresh_token: "refresh-1".to_string(),
        expires_at: Utc::now().timestamp() + secs,
        scope: "user-top-read".to_string(),
    }
}

pub fn authenticator(
    token_url: &str,
    bundle: Option<TokenBundle>,
) -> Authenticator<MemoryTokenStore> {
    let mut config = AuthConfig::new("abc", "http://localhost:8888/callback");
    config.token_url = token_url.to_string();
    Authenticator::new(config, MemoryTokenStore::new(bundle)).unwrap()
}

pub fn client(api_url: &str) -> SpotifyClient {
    SpotifyClient::new(api_url, Arc::new(RateLimiter::new(fast_policy())))
}
