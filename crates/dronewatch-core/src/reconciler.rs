//! Threshold draft/confirmed reconciliation
//!
//! The operator edits a draft; the backend confirms a value. Background polls
//! report the confirmed value many times a second, so they must never
//! overwrite a draft the operator is in the middle of typing. The only time a
//! poll touches the draft is the very first observation, which seeds the
//! editor with the value the backend is actually using.

use tracing::debug;

use crate::client::RemoteClient;
use crate::error::{SettingsError, ValidationError};

/// Draft and confirmed values of the detection threshold
#[derive(Debug, Clone, PartialEq)]
pub struct SettingReconciler {
    draft: f64,
    confirmed: Option<f64>,
}

impl SettingReconciler {
    /// Start with no confirmed value and the given draft
    pub fn new(default_draft: f64) -> Self {
        Self {
            draft: default_draft,
            confirmed: None,
        }
    }

    /// Locally edited value
    pub fn draft(&self) -> f64 {
        self.draft
    }

    /// Last value the backend acknowledged
    pub fn confirmed(&self) -> Option<f64> {
        self.confirmed
    }

    /// Record a value reported by the backend
    ///
    /// Seeds the draft only on the first observation.
    pub fn observe(&mut self, server_value: f64) {
        if self.confirmed.is_none() {
            debug!("Seeding threshold draft from backend: {}", server_value);
            self.draft = server_value;
        }
        self.confirmed = Some(server_value);
    }

    /// Replace the draft with operator input (validated later, on apply)
    pub fn edit(&mut self, user_value: f64) {
        self.draft = user_value;
    }

    /// Record a value the operator just applied and the backend confirmed
    ///
    /// Unlike [`observe`](Self::observe) this always overwrites the draft.
    pub fn confirm(&mut self, server_value: f64) {
        self.confirmed = Some(server_value);
        self.draft = server_value;
    }

    /// The draft, if it is sendable
    pub fn validated_draft(&self) -> Result<f64, ValidationError> {
        validate_threshold(self.draft)
    }

    /// Validate the draft, send it, and confirm the backend's answer
    ///
    /// State is untouched on any failure. Shared owners run this on a copy
    /// taken under their lock and write back with [`confirm`](Self::confirm),
    /// so the lock is not held across the request.
    pub async fn apply<C: RemoteClient>(&mut self, client: &C) -> Result<f64, SettingsError> {
        let value = self.validated_draft()?;
        let confirmed = client.apply_setting(value).await?;
        self.confirm(confirmed);
        Ok(confirmed)
    }
}

/// A threshold must be a finite number in `[0, 1]`
pub fn validate_threshold(value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite);
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::OutOfRange(value));
    }
    Ok(value)
}
