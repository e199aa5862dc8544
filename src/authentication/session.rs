use serde::{Deserialize, Serialize};

use crate::{
    error::ActionError,
    schema::{Id, User, UserRole},
};

use super::permissions::ActionType;

/// Identity of the caller, as resolved by the embedding auth layer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub user_uid: UserRole,
}

impl SessionData {
    pub fn new(user_id: Id, username: String, user_uid: UserRole) -> Self {
        Self {
            user_id,
            username,
            user_uid,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user_uid == UserRole::Admin
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), ActionError> {
        if !action.authenticate(self) {
            log::warn!("> {} is not allowed to {:?}", self.username, action);
            return Err(ActionError::Forbidden(String::from(
                "You don't have permission to perform this action",
            )));
        }
        Ok(())
    }
}

impl From<User> for SessionData {
    fn from(value: User) -> Self {
        Self::new(value.id, value.username, value.uid)
    }
}
