use crate::database::schema::UserRole;
use crate::jwt::SessionData;

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLedger,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLedger,
            ActionType::ManageAllRecipes,
            ActionType::ManageUsers,
            ActionType::ManageCatalog,
        ],
    ),
];

#[derive(Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    /// Subscriptions, favorites and cart entries of the acting user.
    ManageOwnLedger,

    ManageUsers,
    ManageAllRecipes,
    ManageCatalog,
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
    use super::*;
    use crate::database::schema::UserRole;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            email: "cook@example.com".to_string(),
            is_admin: role == UserRole::Admin,
            role,
        }
    }

    #[test]
    fn users_cannot_manage_the_catalog() {
        assert!(ActionType::CreateRecipes.authenticate(&session(UserRole::User)));
        assert!(!ActionType::ManageCatalog.authenticate(&session(UserRole::User)));
        assert!(ActionType::ManageCatalog.authenticate(&session(UserRole::Admin)));
    }
}
