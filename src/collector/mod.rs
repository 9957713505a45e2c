//! Collection orchestrator.
//!
//! A [`Collector`] drives one collection run through
//! `Idle -> Authenticating -> Fetching(source) x5 -> FetchingFeatures ->
//! Assembling -> Done`. The only way into [`CollectionState::Failed`] is an
//! authentication error; failing sources degrade to empty contributions and
//! the run carries on.

mod merge;

use std::{collections::BTreeMap, fmt};

use chrono::Utc;
use indicatif::ProgressBar;

use crate::{
    config::CollectLimits,
    error::Result,
    management::TokenStore,
    spotify::{Authenticator, SpotifyClient, features, tracks},
    types::{CollectionSnapshot, SourceOutcome, SourceTag},
};

pub use merge::TrackSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Idle,
    Authenticating,
    Fetching(SourceTag),
    FetchingFeatures,
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for CollectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionState::Idle => write!(f, "Idle"),
            CollectionState::Authenticating => write!(f, "Checking Spotify token..."),
            CollectionState::Fetching(source) => write!(f, "Fetching {source} tracks..."),
            CollectionState::FetchingFeatures => write!(f, "Fetching audio features..."),
            CollectionState::Assembling => write!(f, "Assembling snapshot..."),
            CollectionState::Done => write!(f, "Collection complete."),
            CollectionState::Failed => write!(f, "Collection failed."),
        }
    }
}

pub struct Collector<'a, S: TokenStore> {
    auth: &'a Authenticator<S>,
    client: SpotifyClient,
    limits: CollectLimits,
    state: CollectionState,
    history: Vec<CollectionState>,
    degraded: Vec<(SourceTag, String)>,
    progress: Option<ProgressBar>,
}

impl<'a, S: TokenStore> Collector<'a, S> {
    pub fn new(auth: &'a Authenticator<S>, client: SpotifyClient, limits: CollectLimits) -> Self {
        Self {
            auth,
            client,
            limits: limits.clamped(),
            state: CollectionState::Idle,
            history: vec![CollectionState::Idle],
            degraded: Vec::new(),
            progress: None,
        }
    }

    /// Mirrors every state transition into `progress`'s message.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> CollectionState {
        self.state
    }

    /// Every state the last run passed through, starting with `Idle`.
    pub fn history(&self) -> &[CollectionState] {
        &self.history
    }

    /// Sources of the last run that contributed nothing, with the reason.
    pub fn degraded(&self) -> &[(SourceTag, String)] {
        &self.degraded
    }

    /// Runs one collection and returns its snapshot.
    ///
    /// # Errors
    ///
    /// Only authentication failures are returned; they leave the collector in
    /// [`CollectionState::Failed`] and no snapshot is produced.
    pub async fn run(&mut self) -> Result<CollectionSnapshot> {
        self.state = CollectionState::Idle;
        self.history = vec![CollectionState::Idle];
        self.degraded.clear();

        self.transition(CollectionState::Authenticating);
        let token = match self.auth.get_valid_token().await {
            Ok(token) => token,
            Err(e) => {
                self.transition(CollectionState::Failed);
                return Err(e);
            }
        };

        let mut collected = TrackSet::new();
        let mut sources: BTreeMap<SourceTag, usize> = BTreeMap::new();

        for source in SourceTag::ALL {
            self.transition(CollectionState::Fetching(source));
            let limit = self.limit_for(source);
            let records = match tracks::fetch_source(&self.client, &token, source, limit).await {
                SourceOutcome::Fetched(records) => records,
                SourceOutcome::Degraded { reason } => {
                    self.degraded.push((source, reason));
                    Vec::new()
                }
            };
            sources.insert(source, records.len());
            collected.merge(records);
        }

        self.transition(CollectionState::FetchingFeatures);
        let found = features::get_audio_features(&self.client, &token, &collected.ids()).await;
        collected.attach_features(&found);

        self.transition(CollectionState::Assembling);
        let snapshot = CollectionSnapshot::new(
            Utc::now().to_rfc3339(),
            sources,
            collected.into_tracks(),
        );

        self.transition(CollectionState::Done);
        Ok(snapshot)
    }

    fn limit_for(&self, source: SourceTag) -> usize {
        match source {
            SourceTag::Recent => self.limits.recent,
            SourceTag::SavedLibrary => self.limits.saved,
            _ => self.limits.top,
        }
    }

    fn transition(&mut self, next: CollectionState) {
        self.state = next;
        self.history.push(next);
        if let Some(pb) = &self.progress {
            pb.set_message(next.to_string());
        }
    }
}
