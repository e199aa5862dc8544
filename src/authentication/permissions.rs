use crate::{
    schema::{RelationKind, UserRole},
    session::SessionData,
};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnCart,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnCart,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnFavorites,
    ManageOwnCart,

    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(&self, session: &SessionData) -> bool {
        let user_uid = &session.user_uid;

        ACTION_TABLE
            .iter()
            .find_map(|(uid, actions)| {
                if user_uid != uid {
                    return None;
                }

                Some(actions.contains(self))
            })
            .unwrap_or(false)
    }
}

impl From<RelationKind> for ActionType {
    fn from(value: RelationKind) -> Self {
        match value {
            RelationKind::Favorite => ActionType::ManageOwnFavorites,
            RelationKind::Cart => ActionType::ManageOwnCart,
        }
    }
}
