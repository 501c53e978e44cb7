//! Subcommands and the glue between the store, the session and the terminal.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use uuid::Uuid;

use activitycache_core::auth::{LoginRequest, RegisterRequest, Session, SessionData};
use activitycache_core::models::parse_activity_date;
use activitycache_core::{Activity, ActivityStore, ApiClient, ApiError, Config, StoreEvent};

use crate::render;

/// Maximum length for interactive email input
const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Subcommand)]
pub enum Command {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Sign in
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// List activities grouped by day
    List,
    /// Show one activity
    Show { id: String },
    /// Create an activity hosted by you
    Create(NewActivity),
    /// Change an activity
    Edit {
        id: String,
        #[command(flatten)]
        changes: ActivityChanges,
    },
    /// Delete an activity
    Delete { id: String },
    /// Join an activity
    Attend { id: String },
    /// Leave an activity
    Unattend { id: String },
}

#[derive(Args)]
pub struct NewActivity {
    #[arg(long)]
    title: String,
    /// Start time, e.g. 2024-03-01T08:00 or 2024-03-01T08:00:00+01:00
    #[arg(long)]
    date: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    category: String,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "")]
    venue: String,
}

#[derive(Args)]
pub struct ActivityChanges {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    venue: Option<String>,
}

impl NewActivity {
    /// Build the activity with a fresh client-side identifier
    fn into_activity(self) -> Result<Activity> {
        let date = parse_date(&self.date)?;
        Ok(Activity {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            description: self.description,
            category: self.category,
            date,
            city: self.city,
            venue: self.venue,
            attendees: Vec::new(),
            is_going: false,
            is_host: false,
        })
    }
}

impl ActivityChanges {
    fn apply(self, activity: &mut Activity) -> Result<()> {
        if let Some(date) = self.date {
            activity.date = parse_date(&date)?;
        }
        if let Some(title) = self.title {
            activity.title = title;
        }
        if let Some(description) = self.description {
            activity.description = description;
        }
        if let Some(category) = self.category {
            activity.category = category;
        }
        if let Some(city) = self.city {
            activity.city = city;
        }
        if let Some(venue) = self.venue {
            activity.venue = venue;
        }
        Ok(())
    }
}

fn parse_date(value: &str) -> Result<chrono::DateTime<chrono::FixedOffset>> {
    parse_activity_date(value).ok_or_else(|| anyhow!("Unrecognised date: {}", value))
}

pub async fn run(command: Command, config: &mut Config, cache_dir: PathBuf) -> Result<()> {
    let client = ApiClient::new(config.api_base_url())?;
    let mut session = Session::new(cache_dir);

    match command {
        Command::Register {
            display_name,
            username,
            email,
        } => {
            let password = rpassword::prompt_password("Password: ")?;
            let request = RegisterRequest {
                display_name,
                username,
                email: email.clone(),
                password,
            };
            let profile = client.register(&request).await.map_err(explain_validation)?;
            session.update(SessionData::from_profile(&profile));
            session.save()?;
            config.last_email = Some(email);
            config.save()?;
            println!("Registered and signed in as {}", profile.username);
            Ok(())
        }
        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt_email()?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            let request = LoginRequest {
                email: email.clone(),
                password,
            };
            let profile = client.login(&request).await.map_err(explain_validation)?;
            session.update(SessionData::from_profile(&profile));
            session.save()?;
            config.last_email = Some(email);
            config.save()?;
            println!("Signed in as {}", profile.username);
            Ok(())
        }
        Command::Logout => {
            session.clear()?;
            println!("Signed out");
            Ok(())
        }
        command => {
            session.load()?;
            let (token, user) = match (session.token(), session.current_user()) {
                (Some(token), Some(user)) => (token.to_string(), user),
                _ => return Err(anyhow!("Not signed in. Run `activitycache login` first.")),
            };
            let client = client.with_token(token);
            let (store, events) = ActivityStore::new(client, user);
            run_with_store(command, &store, events).await
        }
    }
}

async fn run_with_store(
    command: Command,
    store: &ActivityStore<ApiClient>,
    mut events: UnboundedReceiver<StoreEvent>,
) -> Result<()> {
    let result = match command {
        Command::List => store.load_activities().await.map(|()| {
            println!("{}", render::date_groups(&store.activities_by_date()));
        }),
        Command::Show { id } => store.load_activity(&id).await.map(|activity| {
            println!("{}", render::activity_detail(&activity));
        }),
        Command::Create(new) => store.create_activity(new.into_activity()?).await,
        Command::Edit { id, changes } => match store.load_activity(&id).await {
            Ok(mut activity) => {
                changes.apply(&mut activity)?;
                store.edit_activity(activity).await
            }
            Err(e) => Err(e),
        },
        Command::Delete { id } => store
            .delete_activity(&id, format!("delete-{}", id))
            .await
            .map(|()| println!("Deleted {}", id)),
        Command::Attend { id } => match store.load_activity(&id).await {
            Ok(_) => store.attend().await.map(|()| print_selected(store)),
            Err(e) => Err(e),
        },
        Command::Unattend { id } => match store.load_activity(&id).await {
            Ok(_) => store.unattend().await.map(|()| print_selected(store)),
            Err(e) => Err(e),
        },
        Command::Register { .. } | Command::Login { .. } | Command::Logout => {
            return Err(anyhow!("Account commands do not use the activity store"));
        }
    };

    // Surface notifications and follow navigation requests
    while let Ok(event) = events.try_recv() {
        match event {
            StoreEvent::Error { message } => eprintln!("{}", message),
            StoreEvent::Navigate { id } => {
                debug!(id = %id, "Navigating to activity");
                if let Ok(activity) = store.load_activity(&id).await {
                    println!("{}", render::activity_detail(&activity));
                }
            }
            StoreEvent::Changed => {}
        }
    }

    result.context("Operation failed")
}

fn print_selected(store: &ActivityStore<ApiClient>) {
    if let Some(activity) = store.selected() {
        println!("{}", render::activity_detail(&activity));
    }
}

/// Turn service-side field errors into a readable message
fn explain_validation(err: anyhow::Error) -> anyhow::Error {
    let fields = err
        .downcast_ref::<ApiError>()
        .and_then(ApiError::validation)
        .map(|errors| {
            errors
                .errors()
                .iter()
                .map(|e| format!("  {}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("\n")
        });
    match fields {
        Some(fields) => anyhow!("Please fix the following:\n{}", fields),
        None => err,
    }
}

fn prompt_email() -> Result<String> {
    print!("Email: ");
    io::stdout().flush()?;
    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    let email = email.trim().to_string();
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return Err(anyhow!("Invalid email"));
    }
    Ok(email)
}
