use serde::{Deserialize, Serialize};

/// Camera + microphone permission as last observed.
///
/// Only moves forward (`unknown → prompt → granted | denied`); the single way
/// back is `denied → prompt`, and only for a user-initiated retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaPermissionState {
    #[default]
    Unknown,
    Prompt,
    Granted,
    Denied,
}

impl MediaPermissionState {
    fn rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Prompt => 1,
            Self::Granted => 2,
            Self::Denied => 3,
        }
    }

    pub fn can_transition_to(self, next: Self, user_retry: bool) -> bool {
        if self == Self::Denied && next == Self::Prompt {
            return user_retry;
        }
        next.rank() >= self.rank()
    }
}
