//! Integration tests for the Tutora client session layer.
//!
//! These tests drive both identity domains end to end: identity service,
//! session storage, controllers, scoped contexts and route guards.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::sync::Arc;

use anyhow::{Context, Result};
use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use rand::rngs::OsRng;
use serde_json::json;
use tutora_auth::{
    AdminSessionController, Argon2AdminAuthenticator, AuthSnapshot, InMemoryIdentityService,
    MemoryAdminDirectory, RecordingNavigator, SessionConfig, SessionController,
};
use tutora_identity::AdminUser;
use tutora_storage::MemoryStorage;

pub const STUDENT_EMAIL: &str = "amal@tutora.dev";
pub const STUDENT_PASSWORD: &str = "amal-pass";
pub const TEACHER_EMAIL: &str = "tariq@tutora.dev";
pub const TEACHER_PASSWORD: &str = "tariq-pass";
pub const ADMIN_EMAIL: &str = "root@tutora.dev";
pub const ADMIN_PASSWORD: &str = "root-pass";

/// Hashes a password the way admin directory entries are provisioned.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

// ============================================================================
// Test Application
// ============================================================================

/// One browser tab wired to a shared identity service.
pub struct TestApp {
    pub config: SessionConfig,
    pub service: Arc<InMemoryIdentityService>,
    pub storage: Arc<MemoryStorage>,
    pub navigator: Arc<RecordingNavigator>,
    pub authenticator: Argon2AdminAuthenticator,
    pub session: SessionController,
    pub admin: AdminSessionController,
}

impl TestApp {
    /// Creates the tab with both controllers constructed but not started.
    pub fn new() -> Result<Self> {
        let config = SessionConfig::default();
        let service = Arc::new(
            InMemoryIdentityService::new()
                .with_account("u-1", STUDENT_EMAIL, STUDENT_PASSWORD, json!({}))
                .with_account(
                    "u-2",
                    TEACHER_EMAIL,
                    TEACHER_PASSWORD,
                    json!({
                        "full_name": "Tariq B.",
                        "role": "teacher",
                        "avatar_url": "https://cdn.tutora.dev/tariq.png"
                    }),
                ),
        );

        let directory = MemoryAdminDirectory::new().with_admin(
            AdminUser::new("a-1", ADMIN_EMAIL, "Root"),
            hash_password(ADMIN_PASSWORD)?,
        );

        let storage = Arc::new(MemoryStorage::new());
        let navigator = Arc::new(RecordingNavigator::new("/dashboard"));
        let (session, admin) = build_controllers(&config, &service, &storage, &navigator)?;

        Ok(Self {
            config,
            service,
            storage,
            navigator,
            authenticator: Argon2AdminAuthenticator::new(Arc::new(directory)),
            session,
            admin,
        })
    }

    /// Starts both controllers and waits for end-user hydration.
    pub async fn start(&self) -> Result<AuthSnapshot> {
        self.session.start()?;
        self.admin.start()?;
        let snapshot = self.session.context().wait_until_loaded().await?;
        Ok(snapshot)
    }

    /// Simulates a page reload: fresh controllers over the same identity
    /// service and session storage. The new controllers are not started.
    pub fn reload(&mut self) -> Result<()> {
        let (session, admin) =
            build_controllers(&self.config, &self.service, &self.storage, &self.navigator)
                .context("Failed to rebuild controllers")?;
        self.session = session;
        self.admin = admin;
        Ok(())
    }
}

fn build_controllers(
    config: &SessionConfig,
    service: &Arc<InMemoryIdentityService>,
    storage: &Arc<MemoryStorage>,
    navigator: &Arc<RecordingNavigator>,
) -> Result<(SessionController, AdminSessionController)> {
    let session = SessionController::new(service.clone(), navigator.clone(), config.clone())?;
    let admin = AdminSessionController::new(storage.clone(), navigator.clone(), config.clone())?;
    Ok((session, admin))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tutora_auth::{
        admin_sign_in, provide_admin_auth, provide_auth, use_admin_auth, use_auth,
        AdminGuardView, AdminRouteGuard, AuthError, GuardState, GuardView, IdentityError,
        NavigationEvent, RouteGuard, Scope, ServiceCall,
    };
    use tutora_identity::{Role, UserPatch};
    use tutora_storage::SessionStorage;

    const ADMIN_KEY: &str = "adminUser";

    #[tokio::test]
    async fn test_logout_wins_over_in_flight_login() {
        let app = TestApp::new().unwrap();
        app.start().await.unwrap();
        let ctx = app.session.context();

        let mut gate = app.service.hold(ServiceCall::SignIn);
        let login = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.login(STUDENT_EMAIL, STUDENT_PASSWORD).await })
        };
        gate.entered().await;

        ctx.logout().await;
        assert!(ctx.user().is_none());
        assert!(ctx.is_loading(), "login still in flight");

        gate.release();
        let user = login.await.unwrap().unwrap();
        assert_eq!(user.email, STUDENT_EMAIL);

        let snapshot = ctx.wait_until_loaded().await.unwrap();
        assert!(snapshot.user.is_none(), "stale login must not resurrect the user");
        assert_eq!(app.navigator.current_path(), "/");
    }

    #[tokio::test]
    async fn test_logout_issued_before_login_still_wins() {
        let app = TestApp::new().unwrap();
        app.start().await.unwrap();
        let ctx = app.session.context();

        let mut gate = app.service.hold(ServiceCall::SignOut);
        let logout = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.logout().await })
        };
        gate.entered().await;

        ctx.login(TEACHER_EMAIL, TEACHER_PASSWORD).await.unwrap();
        assert_eq!(ctx.user().map(|u| u.id), Some("u-2".to_string()));

        gate.release();
        logout.await.unwrap();

        let snapshot = ctx.wait_until_loaded().await.unwrap();
        assert!(snapshot.user.is_none());
        assert_eq!(app.navigator.current_path(), "/");
    }

    #[tokio::test]
    async fn test_admin_bad_credentials_redirects() {
        let app = TestApp::new().unwrap();
        app.start().await.unwrap();
        let ctx = app.admin.context();

        let err = admin_sign_in(&app.authenticator, &ctx, ADMIN_EMAIL, "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(ctx.admin().is_none());
        assert!(app.storage.get(ADMIN_KEY).unwrap().is_none());

        let mut guard = AdminRouteGuard::new(app.navigator.clone(), &app.config);
        assert_eq!(guard.render(&ctx.snapshot(), |_| ()), AdminGuardView::Redirecting);
        assert_eq!(app.navigator.navigations_to("/admin/login"), 1);
    }

    #[tokio::test]
    async fn test_admin_session_survives_reload() {
        let mut app = TestApp::new().unwrap();
        app.start().await.unwrap();

        let admin = admin_sign_in(
            &app.authenticator,
            &app.admin.context(),
            ADMIN_EMAIL,
            ADMIN_PASSWORD,
        )
        .await
        .unwrap();
        assert!(app.storage.get(ADMIN_KEY).unwrap().is_some());

        app.reload().unwrap();
        assert!(app.admin.snapshot().is_loading);
        app.start().await.unwrap();

        let snapshot = app.admin.snapshot();
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.admin, Some(admin));

        let mut guard = AdminRouteGuard::new(app.navigator.clone(), &app.config);
        assert_eq!(
            guard.render(&snapshot, |a| a.name.clone()),
            AdminGuardView::Protected("Root".to_string())
        );
        assert_eq!(app.navigator.navigations_to("/admin/login"), 0);
    }

    #[tokio::test]
    async fn test_corrupt_admin_record_is_signed_out() {
        let app = TestApp::new().unwrap();
        app.storage.set(ADMIN_KEY, r#"{"id":"a-1","#).unwrap();
        app.start().await.unwrap();

        let snapshot = app.admin.snapshot();
        assert!(snapshot.admin.is_none());
        assert!(!snapshot.is_loading);
        assert!(app.storage.get(ADMIN_KEY).unwrap().is_none());

        let mut guard = AdminRouteGuard::new(app.navigator.clone(), &app.config);
        assert_eq!(guard.render(&snapshot, |_| ()), AdminGuardView::Redirecting);
    }

    #[tokio::test]
    async fn test_admin_logout_redirects_and_clears_storage() {
        let app = TestApp::new().unwrap();
        app.start().await.unwrap();
        let ctx = app.admin.context();
        admin_sign_in(&app.authenticator, &ctx, ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .unwrap();

        ctx.logout().unwrap();

        assert!(ctx.admin().is_none());
        assert!(app.storage.get(ADMIN_KEY).unwrap().is_none());
        assert_eq!(app.navigator.current_path(), "/admin/login");
    }

    #[tokio::test]
    async fn test_no_updates_after_stop() {
        let app = TestApp::new().unwrap();
        app.service
            .set_current_session(app.service.issue_session(STUDENT_EMAIL));
        let mut gate = app.service.hold(ServiceCall::CurrentSession);

        app.session.start().unwrap();
        let ctx = app.session.context();
        let mut receiver = ctx.subscribe();
        gate.entered().await;

        app.session.stop();
        gate.release();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        app.service.emit(app.service.issue_session(TEACHER_EMAIL));

        assert!(!receiver.has_changed().unwrap());
        assert!(ctx.user().is_none());
        assert!(matches!(
            ctx.login(STUDENT_EMAIL, STUDENT_PASSWORD).await,
            Err(AuthError::Inactive)
        ));
    }

    #[tokio::test]
    async fn test_loading_resolves_on_every_path() {
        let app = TestApp::new().unwrap();
        app.service
            .fail_next(ServiceCall::CurrentSession, IdentityError::Timeout);
        let snapshot = app.start().await.unwrap();
        assert!(!snapshot.is_loading);
        assert!(snapshot.user.is_none());

        let ctx = app.session.context();

        assert!(ctx.login(STUDENT_EMAIL, "wrong").await.is_err());
        assert!(!ctx.is_loading());

        app.service.fail_next(
            ServiceCall::SignIn,
            IdentityError::Unavailable("connection reset".into()),
        );
        assert!(ctx.login(STUDENT_EMAIL, STUDENT_PASSWORD).await.is_err());
        assert!(!ctx.is_loading());

        ctx.login(STUDENT_EMAIL, STUDENT_PASSWORD).await.unwrap();
        assert!(!ctx.is_loading());

        app.service.fail_next(
            ServiceCall::SignOut,
            IdentityError::Unavailable("offline".into()),
        );
        ctx.logout().await;
        assert!(!ctx.is_loading());
        assert!(ctx.user().is_none());
    }

    #[tokio::test]
    async fn test_end_user_session_restored_after_reload() {
        let mut app = TestApp::new().unwrap();
        app.start().await.unwrap();
        app.session
            .context()
            .login(TEACHER_EMAIL, TEACHER_PASSWORD)
            .await
            .unwrap();

        app.reload().unwrap();
        let snapshot = app.start().await.unwrap();

        let user = snapshot.user.expect("session should be restored");
        assert_eq!(user.id, "u-2");
        assert_eq!(user.name, "Tariq B.");
        assert_eq!(user.role, Role::Teacher);
        assert_eq!(
            user.avatar.as_deref(),
            Some("https://cdn.tutora.dev/tariq.png")
        );
    }

    #[tokio::test]
    async fn test_consumers_share_state_through_scope() {
        let app = TestApp::new().unwrap();
        app.start().await.unwrap();

        let root = Scope::root();
        let scope = provide_auth(&root, app.session.context());
        let scope = provide_admin_auth(&scope, app.admin.context());
        let page = scope.child();
        let header = scope.child();

        let mut guard = RouteGuard::new(&app.config);
        assert_eq!(guard.evaluate(&use_auth(&page).snapshot()), GuardState::Unauthorized);

        use_auth(&page)
            .login(STUDENT_EMAIL, STUDENT_PASSWORD)
            .await
            .unwrap();
        use_auth(&page).update_user(UserPatch {
            name: Some("Amal K.".to_string()),
            ..UserPatch::default()
        });

        assert_eq!(use_auth(&header).user().unwrap().name, "Amal K.");
        assert_eq!(
            guard.render(&app.session.snapshot(), |u| u.name.clone()),
            GuardView::Protected("Amal K.".to_string())
        );
        assert!(use_admin_auth(&header).admin().is_none(), "domains are independent");

        use_auth(&header).logout().await;
        assert!(matches!(
            guard.render(&app.session.snapshot(), |_| ()),
            GuardView::Unauthorized(_)
        ));
        assert_eq!(
            app.navigator.events(),
            vec![
                NavigationEvent::Navigate("/".to_string()),
                NavigationEvent::Refresh
            ]
        );
    }

    #[tokio::test]
    async fn test_remote_sign_out_is_followed() {
        let app = TestApp::new().unwrap();
        app.start().await.unwrap();
        let ctx = app.session.context();
        ctx.login(STUDENT_EMAIL, STUDENT_PASSWORD).await.unwrap();

        app.service.emit(None);

        assert!(ctx.user().is_none());
        assert!(app.navigator.events().is_empty(), "no navigation on remote change");
    }

    #[tokio::test]
    async fn test_admin_logout_leaves_end_user_signed_in() {
        let app = TestApp::new().unwrap();
        app.start().await.unwrap();
        let ctx = app.session.context();
        ctx.login(STUDENT_EMAIL, STUDENT_PASSWORD).await.unwrap();
        let admin = app.admin.context();
        admin_sign_in(&app.authenticator, &admin, ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .unwrap();

        admin.logout().unwrap();

        assert!(admin.admin().is_none());
        assert_eq!(ctx.user().map(|u| u.id), Some("u-1".to_string()));
    }
}
