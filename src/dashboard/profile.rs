//! Profile and preference updates.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::auth::AuthenticatedUser;
use crate::dashboard::{into_document, now_rfc3339, DashboardError};
use crate::relay::DocumentStore;
use crate::security::{sanitize, FieldError, FieldKind};
use crate::state::GuardState;

/// Preference field holding the dark theme flag.
pub const THEME_FIELD: &str = "philtech-dark-theme";

/// Change the display name everywhere it is held: the identity provider,
/// the `users` document and any live session of the user.
pub async fn update_profile(
    state: &GuardState,
    user: &AuthenticatedUser,
    raw_name: &str,
    now: DateTime<Utc>,
) -> Result<AuthenticatedUser, DashboardError> {
    let name = sanitize(raw_name, FieldKind::Name);
    if !state.validator().is_valid_name(&name) {
        return Err(DashboardError::Invalid(vec![FieldError::new(
            "displayName",
            "Please enter a valid name",
        )]));
    }

    state.identity.update_display_name(&user.id, &name).await?;
    state
        .documents
        .set_merge(
            "users",
            &user.id,
            into_document(json!({
                "displayName": name,
                "email": user.email,
                "updatedAt": now_rfc3339(now),
            })),
        )
        .await?;
    state.sessions.update_display_name(&user.id, &name);

    tracing::info!(user = %user.id, "Profile updated");
    Ok(AuthenticatedUser {
        display_name: name,
        ..user.clone()
    })
}

pub async fn set_theme(
    documents: &dyn DocumentStore,
    user_id: &str,
    dark: bool,
) -> Result<(), DashboardError> {
    documents
        .set_merge("preferences", user_id, into_document(json!({ THEME_FIELD: dark })))
        .await?;
    Ok(())
}

/// Light theme unless the user chose otherwise.
pub async fn load_theme(documents: &dyn DocumentStore, user_id: &str) -> Result<bool, DashboardError> {
    Ok(documents
        .get("preferences", user_id)
        .await?
        .and_then(|doc| doc.field(THEME_FIELD).and_then(Value::as_bool))
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{hash_password, IdentityProvider, Role};
    use crate::config::{GuardConfig, UserConfig};
    use crate::relay::MemoryDocumentStore;

    #[tokio::test]
    async fn test_theme_round_trip() {
        let store = MemoryDocumentStore::default();
        assert!(!load_theme(&store, "u1").await.unwrap());
        set_theme(&store, "u1", true).await.unwrap();
        assert!(load_theme(&store, "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_profile_reaches_every_copy() {
        let mut config = GuardConfig::default();
        config.auth.users.push(UserConfig {
            username: "student".into(),
            email: "student@philtech.edu.ph".into(),
            password_hash: hash_password("Student-Pass-1").unwrap(),
            role: "student".into(),
            full_name: "John Student".into(),
        });
        let state = GuardState::builder(config).build().unwrap();
        let user = state
            .identity
            .authenticate("student", "Student-Pass-1")
            .await
            .unwrap();
        assert_eq!(user.role, Role::Student);
        let session = state.sessions.start(user.clone(), false);

        let updated = update_profile(&state, &user, "  Johnny Doe ", Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.display_name, "Johnny Doe");

        let doc = state.documents.get("users", &user.id).await.unwrap().unwrap();
        assert_eq!(doc.field("displayName"), Some(&json!("Johnny Doe")));
        assert_eq!(
            state.sessions.current_user(&session.token).unwrap().display_name,
            "Johnny Doe"
        );
    }

    #[tokio::test]
    async fn test_update_profile_rejects_bad_name() {
        let state = GuardState::builder(GuardConfig::default()).build().unwrap();
        let user = AuthenticatedUser {
            id: "u1".into(),
            username: "u1".into(),
            email: "u1@example.com".into(),
            role: Role::Student,
            display_name: "U".into(),
        };
        let result = update_profile(&state, &user, "1", Utc::now()).await;
        assert!(matches!(result, Err(DashboardError::Invalid(_))));
    }
}
