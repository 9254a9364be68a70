use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DuplicateDetector, ListenValidator, RetroactivityFilter};
use crate::error::{Result, ScrobbleError};
use crate::lastfm::ScrobbleApi;
use crate::models::{Listen, Scrobble};

/// Outcome of an upload pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub scrobbled: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Entry points the front end drives, bound to one Last.fm client.
pub struct Uploader<'a, A: ScrobbleApi + ?Sized> {
    api: &'a A,
    validator: ListenValidator,
    retroactivity: RetroactivityFilter,
    duplicates: DuplicateDetector,
}

impl<'a, A: ScrobbleApi + ?Sized> Uploader<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            validator: ListenValidator::default(),
            retroactivity: RetroactivityFilter::default(),
            duplicates: DuplicateDetector::default(),
        }
    }

    pub fn with_validator(mut self, validator: ListenValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_retroactivity(mut self, retroactivity: RetroactivityFilter) -> Self {
        self.retroactivity = retroactivity;
        self
    }

    pub fn with_duplicates(mut self, duplicates: DuplicateDetector) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub async fn submit_scrobble(&self, listen: &Listen) -> Result<()> {
        self.api.submit_scrobble(listen).await
    }

    pub async fn remove_invalid_listens<F>(
        &self,
        listens: Vec<Listen>,
        progress: F,
        assume_track_length: bool,
    ) -> Vec<Listen>
    where
        F: FnMut(usize, &Listen),
    {
        self.validator
            .remove_invalid_listens(self.api, listens, progress, assume_track_length)
            .await
    }

    pub fn remove_old_listens(&self, listens: Vec<Listen>) -> Vec<Listen> {
        self.retroactivity.filter(listens, Utc::now())
    }

    pub fn retag_old_listens(&self, listens: Vec<Listen>, timestamp: DateTime<Utc>) -> Vec<Listen> {
        self.retroactivity.retag(listens, timestamp)
    }

    pub async fn is_already_scrobbled(&self, scrobble: &Scrobble) -> Result<bool> {
        self.duplicates.is_already_scrobbled(self.api, scrobble).await
    }

    /// Submits each listen Last.fm does not already have. Failures are counted
    /// and the loop moves on, except a missing session, which ends the pass.
    pub async fn upload<F>(&self, listens: &[Listen], mut progress: F) -> Result<UploadReport>
    where
        F: FnMut(usize, &Listen),
    {
        let mut report = UploadReport::default();

        for (index, listen) in listens.iter().enumerate() {
            progress(index, listen);

            let outcome = match self.is_already_scrobbled(&Scrobble::from(listen)).await {
                Ok(true) => {
                    report.skipped += 1;
                    continue;
                }
                Ok(false) => self.submit_scrobble(listen).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => report.scrobbled += 1,
                Err(ScrobbleError::NotAuthenticated) => return Err(ScrobbleError::NotAuthenticated),
                Err(e) => {
                    tracing::warn!("Failed to scrobble {}: {}", listen, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Upload finished: {} scrobbled, {} already present, {} failed",
            report.scrobbled,
            report.skipped,
            report.failed
        );
        Ok(report)
    }
}
