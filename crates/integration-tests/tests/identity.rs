//! Users, roles, login and administrator seeding against a real database.
//! Skipped when `TEST_DATABASE_URL` is unset.

#![allow(clippy::unwrap_used)]

use gazetteer_admin::db::{RepositoryError, RoleRepository, UserRepository};
use gazetteer_admin::services::{AdminSecrets, AuthError, AuthService, SeedOutcome, seed_admin};
use gazetteer_core::RoleName;
use gazetteer_integration_tests::{test_pool, unique};

const PASSWORD: &str = "correct horse battery";

fn email() -> String {
    format!("{}@example.org", unique("user"))
}

#[tokio::test]
async fn test_create_and_login() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let auth = AuthService::new(&pool);
    let address = email();

    let user = auth.create_user(&address, PASSWORD).await.unwrap();
    assert!(user.active);
    assert!(user.confirmed_at.is_none());

    // Emails are normalized before lookup.
    let current = auth
        .login(&address.to_uppercase(), PASSWORD)
        .await
        .unwrap();
    assert_eq!(current.id, user.id);
    assert!(current.roles.is_empty());

    assert!(matches!(
        auth.login(&address, "wrong password").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.login("nobody@example.org", PASSWORD).await,
        Err(AuthError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_duplicate_email_and_weak_password() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let auth = AuthService::new(&pool);
    let address = email();

    auth.create_user(&address, PASSWORD).await.unwrap();
    assert!(matches!(
        auth.create_user(&address, PASSWORD).await,
        Err(AuthError::UserAlreadyExists)
    ));
    assert!(matches!(
        auth.create_user(&email(), "short").await,
        Err(AuthError::WeakPassword { .. })
    ));
    assert!(matches!(
        auth.create_user("not-an-email", PASSWORD).await,
        Err(AuthError::InvalidEmail(_))
    ));
}

#[tokio::test]
async fn test_inactive_user_cannot_log_in() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let auth = AuthService::new(&pool);
    let users = UserRepository::new(&pool);
    let address = email();

    let user = auth.create_user(&address, PASSWORD).await.unwrap();
    let user = users.set_active(user.id, false).await.unwrap();
    assert!(!user.active);

    assert!(matches!(
        auth.login(&address, PASSWORD).await,
        Err(AuthError::Inactive)
    ));

    users.set_active(user.id, true).await.unwrap();
    auth.login(&address, PASSWORD).await.unwrap();
}

#[tokio::test]
async fn test_confirm_and_delete() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let users = UserRepository::new(&pool);

    let user = AuthService::new(&pool)
        .create_user(&email(), PASSWORD)
        .await
        .unwrap();

    let confirmed = users.confirm(user.id).await.unwrap();
    let first = confirmed.confirmed_at.unwrap();
    // Confirming again keeps the original timestamp.
    let again = users.confirm(user.id).await.unwrap();
    assert_eq!(again.confirmed_at, Some(first));

    users.delete(user.id).await.unwrap();
    assert!(users.get(user.id).await.unwrap().is_none());
    assert!(matches!(
        users.delete(user.id).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn test_role_assignment() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let users = UserRepository::new(&pool);
    let roles = RoleRepository::new(&pool, true);

    let user = AuthService::new(&pool)
        .create_user(&email(), PASSWORD)
        .await
        .unwrap();
    let role = roles
        .create(&RoleName::parse(&unique("ed")).unwrap(), Some("Editors"))
        .await
        .unwrap();

    users.assign_role(user.id, role.id).await.unwrap();
    users.assign_role(user.id, role.id).await.unwrap();
    let held = users.roles_for(user.id).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].id, role.id);

    let session = AuthService::new(&pool)
        .login(user.email.as_str(), PASSWORD)
        .await
        .unwrap();
    assert_eq!(session.roles, [role.name.clone()]);

    users.revoke_role(user.id, role.id).await.unwrap();
    assert!(users.roles_for(user.id).await.unwrap().is_empty());
    assert!(matches!(
        users.revoke_role(user.id, role.id).await,
        Err(RepositoryError::NotFound)
    ));

    // Deleting a role drops its assignments.
    users.assign_role(user.id, role.id).await.unwrap();
    roles.delete(role.id).await.unwrap();
    assert!(users.roles_for(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_role_name_uniqueness_is_configurable() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let name = RoleName::parse(&unique("dup")).unwrap();

    RoleRepository::new(&pool, true).create(&name, None).await.unwrap();
    assert!(matches!(
        RoleRepository::new(&pool, true).create(&name, None).await,
        Err(RepositoryError::Conflict(_))
    ));

    RoleRepository::new(&pool, false)
        .create(&name, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_seed_admin_is_idempotent() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let address = email();
    let secrets = AdminSecrets::from_json(&format!(
        r#"{{"admin_username": "{address}", "admin_password": "{PASSWORD}"}}"#
    ))
    .unwrap();

    let SeedOutcome::Created(admin) = seed_admin(&pool, &secrets).await.unwrap() else {
        panic!("expected a new administrator");
    };
    assert!(admin.active);
    assert!(admin.confirmed_at.is_some());

    let held = UserRepository::new(&pool).roles_for(admin.id).await.unwrap();
    assert!(held.iter().any(|role| role.name == "admin"));

    let second = seed_admin(&pool, &secrets).await.unwrap();
    assert!(matches!(second, SeedOutcome::AlreadyPresent(ref user) if user.id == admin.id));
}

#[tokio::test]
async fn test_failed_seed_leaves_nothing_behind() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let address = email();
    let secrets = AdminSecrets::from_json(&format!(
        r#"{{"admin_username": "{address}", "admin_password": "{PASSWORD}"}}"#
    ))
    .unwrap();

    // Make the role grant fail for this administrator only.
    let function = format!("gazetteer.block_{}", address.replace(['-', '@', '.'], "_"));
    sqlx::query(&format!(
        r"
        CREATE FUNCTION {function}() RETURNS trigger LANGUAGE plpgsql AS $$
        BEGIN
            IF EXISTS (
                SELECT 1 FROM gazetteer.app_user
                WHERE id = NEW.user_id AND email = '{address}'
            ) THEN
                RAISE EXCEPTION 'role grant blocked';
            END IF;
            RETURN NEW;
        END
        $$
        "
    ))
    .execute(&pool)
    .await
    .unwrap();
    let trigger = function.trim_start_matches("gazetteer.").to_string();
    sqlx::query(&format!(
        "CREATE TRIGGER {trigger} BEFORE INSERT ON gazetteer.user_role \
         FOR EACH ROW EXECUTE FUNCTION {function}()"
    ))
    .execute(&pool)
    .await
    .unwrap();

    let failed = seed_admin(&pool, &secrets).await;

    sqlx::query(&format!("DROP TRIGGER {trigger} ON gazetteer.user_role"))
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(&format!("DROP FUNCTION {function}()"))
        .execute(&pool)
        .await
        .unwrap();

    assert!(failed.is_err());
    let users = UserRepository::new(&pool);
    let parsed = gazetteer_core::Email::parse(&address).unwrap();
    assert!(users.get_by_email(&parsed).await.unwrap().is_none());

    let SeedOutcome::Created(admin) = seed_admin(&pool, &secrets).await.unwrap() else {
        panic!("retry should create the administrator");
    };
    assert!(admin.confirmed_at.is_some());
    let held = users.roles_for(admin.id).await.unwrap();
    assert!(held.iter().any(|role| role.name == "admin"));
}
