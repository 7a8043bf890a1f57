//! Pass configuration types.
//!
//! Provides typed configuration with bon builders.
//! Supports both explicit configuration and environment variable fallbacks.

use bon::bon;
use tessera_ir::{Argument, Kwargs};

// ============================================================================
// NORMALIZATION FOLDING
// ============================================================================

/// What to do when a folded normalization still has consumers of its
/// secondary outputs (batch mean / inverse std).
///
/// Those consumers keep reading the normalization node, which is no longer
/// consistent with the folded convolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LiveStatsPolicy {
    /// Fold anyway and log a warning (default).
    #[default]
    Keep,
    /// Leave that conv/normalization pair untouched.
    Skip,
    /// Abort the pass.
    Error,
}

/// Configuration for [`fold_normalization_into_linear_with`](crate::fold::fold_normalization_into_linear_with).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldOptions {
    /// Also fold the training batch-norm variant.
    pub include_training_variant: bool,
    pub live_statistics: LiveStatsPolicy,
}

#[bon]
impl FoldOptions {
    #[builder]
    pub fn builder(
        #[builder(default = false)] include_training_variant: bool,
        #[builder(default)] live_statistics: LiveStatsPolicy,
    ) -> Self {
        Self { include_training_variant, live_statistics }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TESSERA_FOLD_TRAINING_BN=1` - Also fold the training batch-norm variant
    /// * `TESSERA_LIVE_STATS=keep|skip|error` - Secondary-output policy (default: keep)
    pub fn from_env() -> Self {
        let include_training_variant = std::env::var("TESSERA_FOLD_TRAINING_BN").is_ok_and(|v| v == "1");
        let live_statistics =
            std::env::var("TESSERA_LIVE_STATS").ok().and_then(|s| s.parse().ok()).unwrap_or_default();
        Self { include_training_variant, live_statistics }
    }
}

// ============================================================================
// PATTERN TRACING
// ============================================================================

/// Keyword options handed to a pattern callable while it is traced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceOptions {
    pub kwargs: Kwargs,
}

#[bon]
impl TraceOptions {
    #[builder]
    pub fn builder(#[builder(default)] kwargs: Kwargs) -> Self {
        Self { kwargs }
    }

    /// Add or overwrite one keyword option.
    pub fn with(mut self, name: &str, value: impl Into<Argument>) -> Self {
        self.kwargs.insert(name, value.into());
        self
    }

    /// Boolean option, `default` when absent or not a boolean.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.kwargs.get(name).and_then(Argument::as_bool).unwrap_or(default)
    }

    /// Numeric option, `default` when absent or not a number.
    pub fn number(&self, name: &str, default: f64) -> f64 {
        self.kwargs.get(name).and_then(Argument::as_f64).unwrap_or(default)
    }
}
