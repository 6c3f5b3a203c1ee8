use shared::model::RegisterRequest;
use thiserror::Error;

pub const AVATAR_IDS: [u32; 4] = [1, 2, 3, 4];
pub const MAX_NAME_CHARS: usize = 32;

pub fn avatar_url(avatar_id: u32) -> String {
    format!("https://i.pravatar.cc/150?img={}", avatar_id)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error("Please enter your name")]
    EmptyName,
    #[error("Names are limited to {} characters", MAX_NAME_CHARS)]
    NameTooLong,
    #[error("Please select an avatar")]
    NoAvatar,
    #[error("Unknown avatar {0}")]
    UnknownAvatar(u32),
}

#[derive(Debug, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub avatar: Option<u32>,
    pub submitting: bool,
    pub error: Option<String>,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<RegisterRequest, RegistrationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(RegistrationError::NameTooLong);
        }

        let avatar_id = self.avatar.ok_or(RegistrationError::NoAvatar)?;
        if !AVATAR_IDS.contains(&avatar_id) {
            return Err(RegistrationError::UnknownAvatar(avatar_id));
        }

        Ok(RegisterRequest {
            name: name.to_string(),
            avatar_id,
        })
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && self.validate().is_ok()
    }
}
