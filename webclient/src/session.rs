use serde::{Deserialize, Serialize};
use shared::model::User;
use thiserror::Error;

use crate::registration::avatar_url;

pub const USER_ID_KEY: &str = "userId";
pub const USER_NAME_KEY: &str = "userName";
pub const USER_AVATAR_KEY: &str = "userAvatar";
pub const USER_KEY: &str = "user";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("local storage is not available")]
    Unavailable,
    #[error("could not write `{0}` to local storage")]
    Write(&'static str),
    #[error("could not encode the stored user: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key/value storage, `localStorage` in the browser.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &'static str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &'static str) -> Result<(), SessionError>;
}

impl KeyValueStore for web_sys::Storage {
    fn get(&self, key: &str) -> Option<String> {
        self.get_item(key).ok().flatten()
    }

    fn set(&self, key: &'static str, value: &str) -> Result<(), SessionError> {
        self.set_item(key, value).map_err(|_| SessionError::Write(key))
    }

    fn remove(&self, key: &'static str) -> Result<(), SessionError> {
        self.remove_item(key).map_err(|_| SessionError::Write(key))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: String,
    pub display_name: String,
    pub avatar: String,
}

impl SessionIdentity {
    pub fn from_user(user: &User) -> Self {
        SessionIdentity {
            user_id: user.id.clone(),
            display_name: user.name.clone(),
            avatar: avatar_url(user.avatar_id),
        }
    }
}

pub fn load(store: &impl KeyValueStore) -> Option<SessionIdentity> {
    let from_json = store
        .get(USER_KEY)
        .and_then(|raw| serde_json::from_str::<User>(&raw).ok())
        .map(|user| SessionIdentity::from_user(&user));

    let identity = from_json.or_else(|| {
        Some(SessionIdentity {
            user_id: store.get(USER_ID_KEY)?,
            display_name: store.get(USER_NAME_KEY).unwrap_or_default(),
            avatar: store.get(USER_AVATAR_KEY).unwrap_or_default(),
        })
    })?;

    if identity.user_id.trim().is_empty() {
        None
    } else {
        Some(identity)
    }
}

pub fn save(store: &impl KeyValueStore, user: &User) -> Result<SessionIdentity, SessionError> {
    let identity = SessionIdentity::from_user(user);

    store.set(USER_ID_KEY, &identity.user_id)?;
    store.set(USER_NAME_KEY, &identity.display_name)?;
    store.set(USER_AVATAR_KEY, &identity.avatar)?;
    store.set(USER_KEY, &serde_json::to_string(user)?)?;

    Ok(identity)
}

pub fn clear(store: &impl KeyValueStore) -> Result<(), SessionError> {
    for key in [USER_ID_KEY, USER_NAME_KEY, USER_AVATAR_KEY, USER_KEY] {
        store.remove(key)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStore(RefCell<HashMap<String, String>>);

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.borrow().get(key).cloned()
        }

        fn set(&self, key: &'static str, value: &str) -> Result<(), SessionError> {
            self.0.borrow_mut().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &'static str) -> Result<(), SessionError> {
            self.0.borrow_mut().remove(key);
            Ok(())
        }
    }

    fn ada() -> User {
        User {
            id: "u-42".into(),
            name: "Ada".into(),
            avatar_id: 3,
        }
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::default();
        let saved = save(&store, &ada()).unwrap();

        assert_eq!(store.get(USER_ID_KEY).as_deref(), Some("u-42"));
        assert_eq!(store.get(USER_NAME_KEY).as_deref(), Some("Ada"));
        assert_eq!(
            store.get(USER_AVATAR_KEY).as_deref(),
            Some("https://i.pravatar.cc/150?img=3")
        );
        assert_eq!(load(&store), Some(saved));
    }

    #[test]
    fn test_load_falls_back_to_plain_keys() {
        let store = MemoryStore::default();
        store.set(USER_ID_KEY, "u-7").unwrap();
        store.set(USER_NAME_KEY, "Grace").unwrap();

        let identity = load(&store).unwrap();
        assert_eq!(identity.user_id, "u-7");
        assert_eq!(identity.display_name, "Grace");
        assert_eq!(identity.avatar, "");
    }

    #[test]
    fn test_no_identity_without_user_id() {
        let store = MemoryStore::default();
        assert_eq!(load(&store), None);

        store.set(USER_ID_KEY, "  ").unwrap();
        assert_eq!(load(&store), None);

        store.set(USER_KEY, "{not json").unwrap();
        assert_eq!(load(&store), None);
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::default();
        save(&store, &ada()).unwrap();
        clear(&store).unwrap();

        assert_eq!(load(&store), None);
        assert!(store.0.borrow().is_empty());
    }
}
