//! Application state and command handlers.
//!
//! `App` wires the configured credential store into the API client and the
//! session coordinator, then runs one command against them.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, warn};

use staffdir_core::api::{ApiClient, ApiError, WriteOutcome};
use staffdir_core::auth::{ExternalLoginError, SessionCoordinator, SessionState, SignInError};
use staffdir_core::config::Config;
use staffdir_core::models::{Employee, NewEmployee};
use staffdir_core::utils::{format_optional, format_phone, format_salary, truncate_string};

use crate::prompt;
use crate::sign_in::EnvSignIn;

pub const USAGE: &str = "\
Usage: staffdir <command>

Commands:
  status             Show whether you are signed in
  login [username]   Sign in with username and password
  login --google     Sign in with a Google identity token ($STAFFDIR_GOOGLE_ID_TOKEN)
  logout             Sign out
  list               List employees
  add                Add an employee
  edit <id>          Edit an employee
  delete <id>        Delete an employee
  help               Show this message";

/// Column widths for the employee table
const NAME_WIDTH: usize = 22;
const TEXT_WIDTH: usize = 18;
const EMAIL_WIDTH: usize = 28;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Login { username: Option<String> },
    LoginExternal,
    Logout,
    List,
    Add,
    Edit { id: i64 },
    Delete { id: i64 },
    Help,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let arg = |i: usize| args.get(i).map(String::as_str);
        let id = |i: usize| -> Result<i64> {
            let raw = arg(i).ok_or_else(|| anyhow::anyhow!("Missing employee id"))?;
            raw.parse::<i64>()
                .with_context(|| format!("Invalid employee id: {}", raw))
        };

        let command = match arg(0) {
            None | Some("status") => Command::Status,
            Some("login") => match arg(1) {
                Some("--google") => Command::LoginExternal,
                username => Command::Login {
                    username: username.map(str::to_string),
                },
            },
            Some("logout") => Command::Logout,
            Some("list") | Some("ls") => Command::List,
            Some("add") => Command::Add,
            Some("edit") => Command::Edit { id: id(1)? },
            Some("delete") | Some("rm") => Command::Delete { id: id(1)? },
            Some("help") | Some("--help") | Some("-h") => Command::Help,
            Some(other) => anyhow::bail!("Unknown command: {}", other),
        };
        Ok(command)
    }

    fn requires_session(&self) -> bool {
        matches!(
            self,
            Command::List | Command::Add | Command::Edit { .. } | Command::Delete { .. }
        )
    }
}

pub struct App {
    pub config: Config,
    api: ApiClient,
    session: SessionCoordinator,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        debug!(api_url = %config.api_url, store = ?config.store, "Config loaded");

        let store = config.credential_store()?;
        let api = ApiClient::new(&config, Arc::clone(&store))
            .context("Failed to create HTTP client")?;
        let session = SessionCoordinator::new(store).with_sign_in(Arc::new(EnvSignIn));

        Ok(Self {
            config,
            api,
            session,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        let state = self.session.check();
        if command.requires_session() && !state.is_authenticated() {
            anyhow::bail!(self.signed_out_message());
        }

        match command {
            Command::Status => self.status(state),
            Command::Login { username } => self.login_interactive(username).await,
            Command::LoginExternal => self.login_external().await,
            Command::Logout => self.logout().await,
            Command::List => self.list().await,
            Command::Add => self.add().await,
            Command::Edit { id } => self.edit(id).await,
            Command::Delete { id } => self.delete(id).await,
            Command::Help => {
                println!("{}", USAGE);
                Ok(())
            }
        }
    }

    fn signed_out_message(&self) -> &'static str {
        if self.session.session_expired() {
            "Session expired, please log in again with `staffdir login`"
        } else {
            "Not signed in. Run `staffdir login` first"
        }
    }

    fn status(&self, state: SessionState) -> Result<()> {
        match state {
            SessionState::Authenticated => println!("Signed in"),
            SessionState::Unauthenticated => println!("{}", self.signed_out_message()),
        }
        println!("Server: {}", self.api.base_url());
        Ok(())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    async fn login_interactive(&mut self, username: Option<String>) -> Result<()> {
        let default_username = std::env::var("STAFFDIR_USERNAME")
            .ok()
            .or_else(|| self.config.last_username.clone());

        let username = match username {
            Some(u) => u,
            None => prompt::text("Username", default_username.as_deref())?,
        };
        let password = match std::env::var("STAFFDIR_PASSWORD") {
            Ok(p) if !p.is_empty() => p,
            _ => prompt::password()?,
        };

        println!("Authenticating...");
        match self.session.login(&self.api, &username, &password).await {
            Ok(_) => {
                self.config.last_username = Some(username.trim().to_string());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                println!("Login successful!");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                anyhow::bail!(Self::login_error_message(&e))
            }
        }
    }

    /// User-facing message for a failed login
    fn login_error_message(e: &ApiError) -> String {
        match e {
            ApiError::MissingInput(_) => "Username and password required".to_string(),
            ApiError::Http { status: 401, .. } => "Invalid username or password".to_string(),
            ApiError::Network(err) if err.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::Network(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            other => format!("Login failed: {}", other),
        }
    }

    async fn login_external(&mut self) -> Result<()> {
        match self.session.login_with_sign_in(&self.api).await {
            Ok(_) => {
                println!("Login successful!");
                Ok(())
            }
            Err(ExternalLoginError::SignIn(SignInError::Cancelled)) => {
                anyhow::bail!("Sign-in cancelled")
            }
            Err(ExternalLoginError::SignIn(SignInError::InProgress)) => {
                anyhow::bail!("Sign-in already in progress")
            }
            Err(ExternalLoginError::SignIn(SignInError::ServiceUnavailable(reason))) => {
                anyhow::bail!("Sign-in service unavailable: {}", reason)
            }
            Err(ExternalLoginError::Api(e)) => {
                error!(error = %e, "External login rejected");
                anyhow::bail!(Self::login_error_message(&e))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn logout(&mut self) -> Result<()> {
        self.session.logout().await.context("Failed to remove stored token")?;
        println!("Logged out");
        Ok(())
    }

    // =========================================================================
    // Employees
    // =========================================================================

    /// Turn an API failure into a user-facing error. A 401 means the session
    /// was just torn down, so this is also a check point.
    fn api_failure(&mut self, action: &str, e: ApiError) -> anyhow::Error {
        error!(error = %e, action, "Request failed");
        if e.is_unauthorized() {
            self.session.check();
            return anyhow::anyhow!(self.signed_out_message());
        }
        match e {
            ApiError::MissingInput(field) => anyhow::anyhow!("{} is required", field),
            ApiError::Network(_) => anyhow::anyhow!("Failed to {}: unable to reach server", action),
            ApiError::Http { status: 404, .. } => anyhow::anyhow!("Failed to {}: not found", action),
            other => anyhow::anyhow!("Failed to {}: {}", action, other),
        }
    }

    async fn fetch_employees(&mut self) -> Result<Vec<Employee>> {
        match self.api.list_employees().await {
            Ok(employees) => Ok(employees),
            Err(e) => Err(self.api_failure("load employees", e)),
        }
    }

    async fn find_employee(&mut self, id: i64) -> Result<Employee> {
        self.fetch_employees()
            .await?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| anyhow::anyhow!("No employee with id {}", id))
    }

    async fn list(&mut self) -> Result<()> {
        let mut employees = self.fetch_employees().await?;
        if employees.is_empty() {
            println!("No employees found");
            return Ok(());
        }
        employees.sort_by(|a, b| a.name().to_lowercase().cmp(&b.name().to_lowercase()));

        println!(
            "{:>5}  {:<NAME_WIDTH$}  {:<TEXT_WIDTH$}  {:<TEXT_WIDTH$}  {:<EMAIL_WIDTH$}  {:<14}  {:<12}  {:>12}",
            "ID", "Name", "Position", "Department", "Email", "Phone", "Hired", "Salary"
        );
        for employee in &employees {
            println!("{}", format_row(employee));
        }
        Ok(())
    }

    async fn add(&mut self) -> Result<()> {
        let new = prompt_employee(&NewEmployee::default())?;
        match self.api.create_employee(&new).await {
            Ok(outcome) => {
                report_write("Added", &new.name, &outcome);
                Ok(())
            }
            Err(e) => Err(self.api_failure("add employee", e)),
        }
    }

    async fn edit(&mut self, id: i64) -> Result<()> {
        let current = self.find_employee(id).await?;
        let updated = Employee {
            id,
            details: prompt_employee(&current.details)?,
        };
        if updated == current {
            println!("No changes");
            return Ok(());
        }

        match self.api.update_employee(&updated).await {
            Ok(outcome) => {
                report_write("Updated", updated.name(), &outcome);
                Ok(())
            }
            Err(e) => Err(self.api_failure("update employee", e)),
        }
    }

    async fn delete(&mut self, id: i64) -> Result<()> {
        let employee = self.find_employee(id).await?;
        if !prompt::confirm(&format!("Delete {} ({})?", employee.name(), id))? {
            println!("Cancelled");
            return Ok(());
        }
        match self.api.delete_employee(id).await {
            Ok(()) => {
                println!("Deleted {}", employee.name());
                Ok(())
            }
            Err(e) => Err(self.api_failure("delete employee", e)),
        }
    }
}

fn prompt_employee(current: &NewEmployee) -> Result<NewEmployee> {
    Ok(NewEmployee {
        name: prompt::text("Name", Some(current.name.as_str()))?,
        email: prompt::text("Email", Some(current.email.as_str()))?,
        position: prompt::text("Position", Some(current.position.as_str()))?,
        department: prompt::text("Department", Some(current.department.as_str()))?,
        phone: prompt::optional("Phone", current.phone.as_deref())?,
        hire_date: prompt::date("Hire date (YYYY-MM-DD)", current.hire_date)?,
        salary: prompt::amount("Salary", current.salary)?,
    })
}

fn report_write(verb: &str, name: &str, outcome: &WriteOutcome) {
    match outcome {
        WriteOutcome::Record(employee) => println!("{} {} (id {})", verb, employee.name(), employee.id),
        WriteOutcome::Acknowledged { message: Some(message) } => println!("{}", message),
        WriteOutcome::Acknowledged { message: None } => println!("{} {}", verb, name),
    }
}

fn format_row(employee: &Employee) -> String {
    let d = &employee.details;
    let phone = d.phone.as_deref().map(format_phone);
    format!(
        "{:>5}  {:<NAME_WIDTH$}  {:<TEXT_WIDTH$}  {:<TEXT_WIDTH$}  {:<EMAIL_WIDTH$}  {:<14}  {:<12}  {:>12}",
        employee.id,
        truncate_string(&d.name, NAME_WIDTH),
        truncate_string(&d.position, TEXT_WIDTH),
        truncate_string(&d.department, TEXT_WIDTH),
        truncate_string(&d.email, EMAIL_WIDTH),
        format_optional(phone.as_deref(), "-"),
        employee.hire_date_display(),
        format_salary(d.salary),
    )
}
