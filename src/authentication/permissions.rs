use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnShoppingCart,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageOwnProfile,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnShoppingCart,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageOwnProfile,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnFavorites,
    ManageOwnShoppingCart,
    ManageOwnSubscriptions,
    ManageOwnProfile,

    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let role = &session.role;

        ACTION_TABLE
            .iter()
            .find_map(|(uid, actions)| {
                if role != uid {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            session_id: String::new(),
            user_id: 1,
            username: String::from("cook"),
            is_admin: role == UserRole::Admin,
            role,
        }
    }

    #[rstest]
    #[case(UserRole::User, ActionType::CreateRecipes, true)]
    #[case(UserRole::User, ActionType::ManageOwnRecipes, true)]
    #[case(UserRole::User, ActionType::ManageOwnFavorites, true)]
    #[case(UserRole::User, ActionType::ManageAllRecipes, false)]
    #[case(UserRole::Admin, ActionType::ManageAllRecipes, true)]
    #[case(UserRole::Admin, ActionType::ManageOwnSubscriptions, true)]
    fn action_table(#[case] role: UserRole, #[case] action: ActionType, #[case] allowed: bool) {
        assert_eq!(action.authenticate(&session(role)), allowed);
    }

    #[test]
    fn denied_action_is_forbidden() {
        let err = session(UserRole::User)
            .authenticate(ActionType::ManageAllRecipes)
            .err();

        assert_eq!(err.map(|e| e.code), Some(403));
    }
}
