//! Count-bound and payload policy for the image collection.
//!
//! The gate is a pure function of current state: calling it repeatedly
//! without an intervening mutation returns the same result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::image_set::LocalImageSet;
use crate::media::payload::ImagePayload;

/// Locally detected errors that block a submission before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("collection holds {actual} images but at least {min} are required")]
    BelowMinimum { min: usize, actual: usize },

    #[error("collection holds {actual} images but at most {max} are allowed")]
    AboveMaximum { max: usize, actual: usize },

    #[error("unsupported media type: {mime}")]
    InvalidMediaType { mime: String },

    #[error("payload of {actual_bytes} bytes exceeds the {limit_bytes} byte limit")]
    PayloadTooLarge {
        limit_bytes: usize,
        actual_bytes: usize,
    },
}

/// Asset-count and payload-size policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountPolicy {
    /// Minimum number of visible assets required at submission time.
    pub min_assets: usize,
    /// Maximum number of visible assets, enforced at add time.
    pub max_assets: usize,
    /// Maximum size in bytes of a single local payload.
    pub max_payload_bytes: usize,
}

impl Default for CountPolicy {
    fn default() -> Self {
        Self {
            min_assets: 1,
            max_assets: 10,
            max_payload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl CountPolicy {
    /// Payload checks run at add time so a bad file never enters the set.
    pub fn check_payload(&self, payload: &ImagePayload) -> Result<(), ValidationError> {
        if !payload.mime.is_supported_image() {
            return Err(ValidationError::InvalidMediaType {
                mime: payload.mime.to_string(),
            });
        }
        if payload.len() > self.max_payload_bytes {
            return Err(ValidationError::PayloadTooLarge {
                limit_bytes: self.max_payload_bytes,
                actual_bytes: payload.len(),
            });
        }
        Ok(())
    }
}

/// Enforces the minimum/maximum asset-count policy at submission time.
#[derive(Debug, Clone)]
pub struct ValidationGate {
    policy: CountPolicy,
}

impl ValidationGate {
    pub fn new(policy: CountPolicy) -> Self {
        Self { policy }
    }

    /// Validate count bounds. The maximum is already enforced by `add`;
    /// the check here is defensive.
    pub fn validate(&self, set: &LocalImageSet) -> Result<(), ValidationError> {
        let actual = set.visible_count();
        if actual < self.policy.min_assets {
            return Err(ValidationError::BelowMinimum {
                min: self.policy.min_assets,
                actual,
            });
        }
        if actual > self.policy.max_assets {
            return Err(ValidationError::AboveMaximum {
                max: self.policy.max_assets,
                actual,
            });
        }
        Ok(())
    }
}
