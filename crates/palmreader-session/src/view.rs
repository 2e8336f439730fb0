//! The screens a session can be on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A screen of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    /// Shown until bootstrap has decided where to go.
    Splash,
    Onboarding,
    ProfileSetup,
    Dashboard,
    PalmScan,
    PalmChat,
    Tarot,
    DailyGuidance,
    Horoscope,
    Settings,
    Privacy,
    DisclaimerFull,
}

impl View {
    pub const ALL: [View; 12] = [
        View::Splash,
        View::Onboarding,
        View::ProfileSetup,
        View::Dashboard,
        View::PalmScan,
        View::PalmChat,
        View::Tarot,
        View::DailyGuidance,
        View::Horoscope,
        View::Settings,
        View::Privacy,
        View::DisclaimerFull,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Splash => "splash",
            Self::Onboarding => "onboarding",
            Self::ProfileSetup => "profile-setup",
            Self::Dashboard => "dashboard",
            Self::PalmScan => "palm-scan",
            Self::PalmChat => "palm-chat",
            Self::Tarot => "tarot",
            Self::DailyGuidance => "daily-guidance",
            Self::Horoscope => "horoscope",
            Self::Settings => "settings",
            Self::Privacy => "privacy",
            Self::DisclaimerFull => "disclaimer-full",
        }
    }

    /// Whether the short disclaimer footer is shown on this screen.
    pub fn shows_disclaimer(&self) -> bool {
        !matches!(self, Self::Splash | Self::Onboarding)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A view name that does not match any [`View`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown view: {0}")]
pub struct UnknownView(pub String);

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|view| view.as_str() == s)
            .ok_or_else(|| UnknownView(s.to_owned()))
    }
}
