//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handling never reads environment variables.

use crate::constants::DEFAULT_REFERRAL_DATA_DIR;
use crate::{ReferralError, ReferralResult};
use std::path::{Path, PathBuf};

pub const REFERRAL_DATA_DIR_ENV: &str = "REFERRAL_DATA_DIR";
pub const EREFERRALS_BASE_URL_ENV: &str = "EREFERRALS_BASE_URL";
pub const EREFERRALS_CREATE_REFERRAL_ENDPOINT_ENV: &str = "EREFERRALS_CREATE_REFERRAL_ENDPOINT";
pub const DENTAL_UI_BASE_URL_ENV: &str = "DENTAL_UI_BASE_URL";

/// Endpoints written into the MessageHeader of a synthesized bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleCreationConfig {
    ereferrals_base_url: String,
    ereferrals_create_referral_endpoint: String,
    dental_ui_base_url: String,
}

fn required(name: &str, value: String) -> ReferralResult<String> {
    if value.trim().is_empty() {
        return Err(ReferralError::InvalidInput(format!("{name} cannot be empty")));
    }
    Ok(value)
}

impl BundleCreationConfig {
    /// Create a new `BundleCreationConfig`. Every value must be non-blank.
    pub fn new(
        ereferrals_base_url: String,
        ereferrals_create_referral_endpoint: String,
        dental_ui_base_url: String,
    ) -> ReferralResult<Self> {
        Ok(Self {
            ereferrals_base_url: required("ereferrals_base_url", ereferrals_base_url)?,
            ereferrals_create_referral_endpoint: required(
                "ereferrals_create_referral_endpoint",
                ereferrals_create_referral_endpoint,
            )?,
            dental_ui_base_url: required("dental_ui_base_url", dental_ui_base_url)?,
        })
    }

    pub fn ereferrals_base_url(&self) -> &str {
        &self.ereferrals_base_url
    }

    pub fn ereferrals_create_referral_endpoint(&self) -> &str {
        &self.ereferrals_create_referral_endpoint
    }

    pub fn dental_ui_base_url(&self) -> &str {
        &self.dental_ui_base_url
    }

    /// Base URL and create-referral path joined as-is.
    pub fn destination_endpoint(&self) -> String {
        format!(
            "{}{}",
            self.ereferrals_base_url, self.ereferrals_create_referral_endpoint
        )
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    referral_data_dir: PathBuf,
    bundle_creation: BundleCreationConfig,
}

impl CoreConfig {
    pub fn new(referral_data_dir: PathBuf, bundle_creation: BundleCreationConfig) -> Self {
        Self {
            referral_data_dir,
            bundle_creation,
        }
    }

    pub fn referral_data_dir(&self) -> &Path {
        &self.referral_data_dir
    }

    pub fn bundle_creation(&self) -> &BundleCreationConfig {
        &self.bundle_creation
    }
}

/// Resolve the referral data directory from an optional override.
///
/// Blank overrides fall back to [`DEFAULT_REFERRAL_DATA_DIR`].
pub fn referral_data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REFERRAL_DATA_DIR))
}

/// Build a [`BundleCreationConfig`] from optional raw values, naming the first missing one.
pub fn bundle_creation_from_env_values(
    ereferrals_base_url: Option<String>,
    ereferrals_create_referral_endpoint: Option<String>,
    dental_ui_base_url: Option<String>,
) -> ReferralResult<BundleCreationConfig> {
    let present = |name: &str, value: Option<String>| {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ReferralError::InvalidInput(format!("{name} must be set")))
    };

    BundleCreationConfig::new(
        present(EREFERRALS_BASE_URL_ENV, ereferrals_base_url)?,
        present(
            EREFERRALS_CREATE_REFERRAL_ENDPOINT_ENV,
            ereferrals_create_referral_endpoint,
        )?,
        present(DENTAL_UI_BASE_URL_ENV, dental_ui_base_url)?,
    )
}

/// Resolve the referral data directory from `REFERRAL_DATA_DIR`.
pub fn referral_data_dir_from_env() -> PathBuf {
    referral_data_dir_from_env_value(std::env::var(REFERRAL_DATA_DIR_ENV).ok())
}

/// Resolve the synthesizer endpoints from the environment.
///
/// # Errors
///
/// [`ReferralError::InvalidInput`] naming the first variable that is unset or blank.
pub fn bundle_creation_from_env() -> ReferralResult<BundleCreationConfig> {
    bundle_creation_from_env_values(
        std::env::var(EREFERRALS_BASE_URL_ENV).ok(),
        std::env::var(EREFERRALS_CREATE_REFERRAL_ENDPOINT_ENV).ok(),
        std::env::var(DENTAL_UI_BASE_URL_ENV).ok(),
    )
}

/// Resolve the full [`CoreConfig`] once at process startup.
pub fn core_config_from_env() -> ReferralResult<CoreConfig> {
    Ok(CoreConfig::new(
        referral_data_dir_from_env(),
        bundle_creation_from_env()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_values() {
        let err = BundleCreationConfig::new(
            "https://ereferrals.example".into(),
            "  ".into(),
            "https://ui.example".into(),
        )
        .expect_err("blank endpoint");
        assert!(err.to_string().contains("ereferrals_create_referral_endpoint"));
    }

    #[test]
    fn reports_missing_environment_value() {
        let err = bundle_creation_from_env_values(
            Some("https://ereferrals.example".into()),
            Some("/api/referrals".into()),
            None,
        )
        .expect_err("missing ui url");
        assert!(err.to_string().contains("DENTAL_UI_BASE_URL"));

        let err = bundle_creation_from_env_values(
            Some(" ".into()),
            Some("/api/referrals".into()),
            Some("https://ui.example".into()),
        )
        .expect_err("blank base url");
        assert!(err.to_string().contains("EREFERRALS_BASE_URL"));
    }

    #[test]
    fn joins_destination_endpoint() {
        let cfg = BundleCreationConfig::new(
            "https://ereferrals.example".into(),
            "/api/referrals".into(),
            "https://ui.example".into(),
        )
        .expect("valid config");
        assert_eq!(cfg.destination_endpoint(), "https://ereferrals.example/api/referrals");
    }

    #[test]
    fn data_dir_defaults_when_blank() {
        assert_eq!(
            referral_data_dir_from_env_value(Some("  ".into())),
            PathBuf::from(DEFAULT_REFERRAL_DATA_DIR)
        );
        assert_eq!(
            referral_data_dir_from_env_value(Some("/srv/referrals".into())),
            PathBuf::from("/srv/referrals")
        );
    }
}
