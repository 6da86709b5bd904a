//! Tutora CLI - Interactive console session.
//!
//! Runs both session controllers against an in-memory identity service and
//! one session storage (one "tab"), and renders routes through the guards.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Context, Result};
use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutora_auth::{
    admin_sign_in, AdminGuardView, AdminRouteGuard, AdminSessionController,
    Argon2AdminAuthenticator, AuthError, GuardView, InMemoryIdentityService, MemoryAdminDirectory,
    Navigator, RouteGuard, SessionConfig, SessionController,
};
use tutora_identity::AdminUser;
use tutora_storage::MemoryStorage;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "tutora")]
#[command(about = "Tutora - Interactive authentication console")]
#[command(version)]
struct Cli {
    /// Account directory (JSON with `users` and `admins`)
    #[arg(long, env = "TUTORA_DIRECTORY")]
    directory: Option<PathBuf>,

    /// Site root, target of end-user logout
    #[arg(long, default_value = "/", env = "TUTORA_HOME_PATH")]
    home_path: String,

    /// End-user sign-in page
    #[arg(long, default_value = "/login", env = "TUTORA_SIGN_IN_PATH")]
    sign_in_path: String,

    /// End-user sign-up page
    #[arg(long, default_value = "/signup", env = "TUTORA_SIGN_UP_PATH")]
    sign_up_path: String,

    /// Admin sign-in page
    #[arg(long, default_value = "/admin/login", env = "TUTORA_ADMIN_LOGIN_PATH")]
    admin_login_path: String,

    /// Session storage key of the admin record
    #[arg(long, default_value = "adminUser", env = "TUTORA_ADMIN_STORAGE_KEY")]
    admin_storage_key: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session (default)
    Console,
    /// Print an Argon2 hash for an admin directory entry
    HashPassword {
        /// Password to hash
        password: String,
    },
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            home_path: self.home_path.clone(),
            sign_in_path: self.sign_in_path.clone(),
            sign_up_path: self.sign_up_path.clone(),
            admin_login_path: self.admin_login_path.clone(),
            admin_storage_key: self.admin_storage_key.clone(),
        }
    }
}

// ============================================================================
// Account Directory
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Directory {
    users: Vec<DirectoryUser>,
    admins: Vec<DirectoryAdmin>,
}

#[derive(Debug, Deserialize)]
struct DirectoryUser {
    id: String,
    email: String,
    password: String,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DirectoryAdmin {
    id: String,
    email: String,
    name: String,
    password_hash: String,
}

fn load_directory(path: Option<&Path>) -> Result<Directory> {
    let Some(path) = path else {
        tracing::warn!("No account directory given, starting with no accounts");
        return Ok(Directory::default());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read account directory {}", path.display()))?;
    let directory: Directory =
        serde_json::from_str(&raw).context("Failed to parse account directory")?;

    tracing::info!(
        users = directory.users.len(),
        admins = directory.admins.len(),
        "Account directory loaded"
    );
    Ok(directory)
}

// ============================================================================
// Console Navigator
// ============================================================================

/// Navigator printing every request and tracking the current path.
struct ConsoleNavigator {
    path: Mutex<String>,
}

impl ConsoleNavigator {
    fn new(initial_path: &str) -> Self {
        Self {
            path: Mutex::new(initial_path.to_string()),
        }
    }

    fn current(&self) -> String {
        self.path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for ConsoleNavigator {
    fn navigate_to(&self, path: &str) {
        println!("  -> navigated to {}", path);
        *self.path.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
    }

    fn refresh_current_view(&self) {
        println!("  -> view refreshed");
    }
}

// ============================================================================
// Console Session
// ============================================================================

/// One browser tab: the controllers are rebuilt on `reload`, the identity
/// service and session storage are not.
struct Tab {
    config: SessionConfig,
    service: Arc<InMemoryIdentityService>,
    storage: Arc<MemoryStorage>,
    navigator: Arc<ConsoleNavigator>,
    authenticator: Argon2AdminAuthenticator,
    session: SessionController,
    admin: AdminSessionController,
}

impl Tab {
    async fn open(config: SessionConfig, directory: Directory) -> Result<Self> {
        let service = Arc::new(InMemoryIdentityService::new());
        for user in directory.users {
            service.add_account(&user.id, &user.email, &user.password, user.user_metadata);
        }

        let mut admins = MemoryAdminDirectory::new();
        for admin in directory.admins {
            admins = admins.with_admin(
                AdminUser::new(admin.id, admin.email, admin.name),
                admin.password_hash,
            );
        }

        let storage = Arc::new(MemoryStorage::new());
        let navigator = Arc::new(ConsoleNavigator::new(&config.home_path));
        let (session, admin) = start_controllers(&config, &service, &storage, &navigator).await?;

        Ok(Self {
            config,
            service,
            storage,
            navigator,
            authenticator: Argon2AdminAuthenticator::new(Arc::new(admins)),
            session,
            admin,
        })
    }

    async fn reload(&mut self) -> Result<()> {
        self.session.stop();
        self.admin.stop();
        let (session, admin) =
            start_controllers(&self.config, &self.service, &self.storage, &self.navigator)
                .await?;
        self.session = session;
        self.admin = admin;
        println!("Reloaded.");
        Ok(())
    }

    async fn login(&self, email: &str, password: &str) {
        match self.session.context().login(email, password).await {
            Ok(user) => println!(
                "Signed in as {} <{}> ({})",
                user.name,
                user.email,
                user.role.as_str()
            ),
            Err(e) => println!("Sign-in failed: {}", e),
        }
    }

    async fn admin_login(&self, email: &str, password: &str) -> Result<()> {
        let context = self.admin.context();
        match admin_sign_in(&self.authenticator, &context, email, password).await {
            Ok(admin) => {
                println!("Admin signed in as {} <{}>", admin.name, admin.email);
                self.navigator.navigate_to("/admin");
            },
            Err(AuthError::InvalidCredentials) => println!("Invalid credentials"),
            Err(e) => bail!(e),
        }
        Ok(())
    }

    fn admin_logout(&self) -> Result<()> {
        self.admin.context().logout()?;
        println!("Admin signed out.");
        Ok(())
    }

    fn whoami(&self) {
        let snapshot = self.session.snapshot();
        match (&snapshot.user, snapshot.is_loading) {
            (_, true) => println!("User:  (loading)"),
            (Some(user), false) => println!(
                "User:  {} <{}> ({})",
                user.name,
                user.email,
                user.role.as_str()
            ),
            (None, false) => println!("User:  (signed out)"),
        }

        match self.admin.snapshot().admin {
            Some(admin) => println!("Admin: {} <{}>", admin.name, admin.email),
            None => println!("Admin: (signed out)"),
        }
        println!("Path:  {}", self.navigator.current());
    }

    fn visit(&self, path: &str) {
        self.navigator.navigate_to(path);

        let public = [
            self.config.home_path.as_str(),
            self.config.sign_in_path.as_str(),
            self.config.sign_up_path.as_str(),
            self.config.admin_login_path.as_str(),
        ];
        if public.contains(&path) {
            println!("Public page.");
            return;
        }

        if path == "/admin" || path.starts_with("/admin/") {
            let navigator: Arc<dyn Navigator> = self.navigator.clone();
            let mut guard = AdminRouteGuard::new(navigator, &self.config);
            match guard.render(&self.admin.snapshot(), |admin| admin.name.clone()) {
                AdminGuardView::Loading => println!("Loading..."),
                AdminGuardView::Protected(name) => println!("Admin area for {}.", name),
                AdminGuardView::Redirecting => {},
            }
            return;
        }

        let mut guard = RouteGuard::new(&self.config);
        match guard.render(&self.session.snapshot(), |user| user.name.clone()) {
            GuardView::Loading => println!("Loading..."),
            GuardView::Protected(name) => println!("Welcome, {}.", name),
            GuardView::Unauthorized(view) => {
                println!("Sign-in required.");
                println!("  Sign in:  {}", view.sign_in);
                println!("  Sign up:  {}", view.sign_up);
                println!("  Home:     {}", view.home);
            },
        }
    }
}

async fn start_controllers(
    config: &SessionConfig,
    service: &Arc<InMemoryIdentityService>,
    storage: &Arc<MemoryStorage>,
    navigator: &Arc<ConsoleNavigator>,
) -> Result<(SessionController, AdminSessionController)> {
    let session = SessionController::new(service.clone(), navigator.clone(), config.clone())?;
    session.start()?;
    session.context().wait_until_loaded().await?;

    let admin = AdminSessionController::new(storage.clone(), navigator.clone(), config.clone())?;
    admin.start()?;

    Ok((session, admin))
}

// ============================================================================
// Command Handlers
// ============================================================================

fn print_help() {
    println!("Commands:");
    println!("  login <email> <password>        Sign in as an end user");
    println!("  logout                          Sign out the end user");
    println!("  admin-login <email> <password>  Sign in as an admin");
    println!("  admin-logout                    Sign out the admin");
    println!("  whoami                          Show both identities");
    println!("  visit <path>                    Render a route through its guard");
    println!("  reload                          Reload the tab");
    println!("  quit                            Exit");
}

async fn cmd_console(cli: &Cli) -> Result<()> {
    let config = cli.session_config();
    config.validate()?;
    let directory = load_directory(cli.directory.as_deref())?;
    let mut tab = Tab::open(config, directory).await?;

    println!("Tutora console. Type 'help' for commands.");
    let stdin = io::stdin();
    loop {
        print!("tutora> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts.as_slice() {
            [] => {},
            ["help"] => print_help(),
            ["login", email, password] => tab.login(email, password).await,
            ["logout"] => {
                tab.session.context().logout().await;
                println!("Signed out.");
            },
            ["admin-login", email, password] => tab.admin_login(email, password).await?,
            ["admin-logout"] => tab.admin_logout()?,
            ["whoami"] => tab.whoami(),
            ["visit", path] => tab.visit(path),
            ["reload"] => tab.reload().await?,
            ["quit"] | ["exit"] => break,
            _ => println!("Unknown command. Type 'help' for commands."),
        }
    }

    tab.session.stop();
    tab.admin.stop();
    Ok(())
}

fn cmd_hash_password(password: &str) -> Result<()> {
    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    println!("{}", hash);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        None | Some(Commands::Console) => cmd_console(&cli).await,
        Some(Commands::HashPassword { password }) => cmd_hash_password(password),
    }
}
