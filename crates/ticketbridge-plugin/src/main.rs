//! ticketbridge command-line tool
//!
//! Configures projects and files Redmine issues through the same plugin the
//! error tracker loads, with options kept in a local JSON file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use ticketbridge_core::models::{Notification, OptionKey};
use ticketbridge_core::storage::{init_config_dir, FileOptionStore};
use ticketbridge_plugin::forms::FormData;
use ticketbridge_plugin::{NewIssueForm, NotificationPlugin, PluginError, RedmineAutoTicketPlugin};
use ticketbridge_redmine::RedmineClient;

#[derive(Parser, Debug)]
#[command(name = "ticketbridge")]
#[command(about = "File Redmine issues from error-tracker events", long_about = None)]
struct Args {
    /// Option store file
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate Redmine settings against the server and save them
    Configure {
        #[arg(long)]
        project: String,
        #[arg(long)]
        host: String,
        #[arg(long)]
        key: String,
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        tracker_id: String,
        #[arg(long)]
        default_priority: Option<String>,
        /// JSON object merged into every new issue
        #[arg(long)]
        extra_fields: Option<String>,
    },
    /// Show the stored settings for a project
    Show {
        #[arg(long)]
        project: String,
    },
    /// List tracker ids
    Trackers {
        #[arg(long)]
        project: String,
    },
    /// List issue priority ids
    Priorities {
        #[arg(long)]
        project: String,
    },
    /// File an issue by hand
    Create {
        #[arg(long)]
        project: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    /// Run the auto-ticket handler on a notification JSON file
    Notify {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the browsable URL of an issue
    Url {
        #[arg(long)]
        project: String,
        #[arg(long)]
        issue_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(&args.log_level)
        .init();

    let store_path = match args.store {
        Some(path) => path,
        None => init_config_dir()?.join("options.json"),
    };
    tracing::debug!("Option store: {}", store_path.display());

    let store = Arc::new(
        FileOptionStore::open(&store_path)
            .with_context(|| format!("failed to open {}", store_path.display()))?,
    );
    let plugin = RedmineAutoTicketPlugin::new(store.clone())?;

    match args.command {
        Command::Configure {
            project,
            host,
            key,
            project_id,
            tracker_id,
            default_priority,
            extra_fields,
        } => {
            let mut form = FormData::new();
            form.insert(OptionKey::Host.as_str().to_string(), host);
            form.insert(OptionKey::Key.as_str().to_string(), key);
            form.insert(OptionKey::ProjectId.as_str().to_string(), project_id);
            form.insert(OptionKey::TrackerId.as_str().to_string(), tracker_id);
            form.insert(
                OptionKey::DefaultPriority.as_str().to_string(),
                default_priority.unwrap_or_default(),
            );
            form.insert(
                OptionKey::ExtraFields.as_str().to_string(),
                extra_fields.unwrap_or_default(),
            );

            match plugin.configure(&project, &form).await {
                Ok(config) => println!("Saved Redmine settings for {} ({})", project, config.host),
                Err(PluginError::Validation(errors)) => {
                    for message in &errors.form {
                        eprintln!("error: {}", message);
                    }
                    for (field, messages) in &errors.fields {
                        for message in messages {
                            eprintln!("{}: {}", field, message);
                        }
                    }
                    anyhow::bail!("settings were not saved");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Show { project } => {
            for (name, shown) in describe_options(&store, &project) {
                println!("{:<18} {}", name, shown);
            }
            println!(
                "{:<18} {}",
                "configured",
                plugin.load_config(&project).is_ok()
            );
        }
        Command::Trackers { project } => {
            let config = plugin.load_config(&project)?;
            let client = RedmineClient::new(config.host, config.key);
            for tracker in client.list_trackers().await? {
                println!("{:>5}  {}", tracker.id, tracker.name);
            }
        }
        Command::Priorities { project } => {
            let config = plugin.load_config(&project)?;
            let client = RedmineClient::new(config.host, config.key);
            for priority in client.list_issue_priorities().await? {
                let marker = if priority.is_default { " (default)" } else { "" };
                println!("{:>5}  {}{}", priority.id, priority.name, marker);
            }
        }
        Command::Create {
            project,
            title,
            description,
        } => {
            let mut data = FormData::new();
            data.insert("title".to_string(), title);
            data.insert("description".to_string(), description);
            let form = NewIssueForm::validate(&data)?;

            let created = plugin.create_issue_in(&project, &form).await?;
            println!("Created issue #{}: {}", created.id, created.url);
        }
        Command::Notify { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let notification: Notification = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a valid notification", file.display()))?;

            match plugin.post_process(&notification).await? {
                Some(created) => println!("Created issue #{}: {}", created.id, created.url),
                None => println!("No issue created"),
            }
        }
        Command::Url { project, issue_id } => {
            println!("{}", plugin.issue_url_in(&project, issue_id)?);
        }
    }

    Ok(())
}

/// Store location followed by every option, with the API key masked.
fn describe_options(store: &FileOptionStore, project: &str) -> Vec<(&'static str, String)> {
    let options = store.project_options(project);
    let mut lines = vec![("store", store.path().display().to_string())];

    for key in OptionKey::ALL {
        let value = options.get(key.as_str());
        let shown = match key {
            OptionKey::Key => mask_secret(value.and_then(|v| v.as_str())),
            _ => match value {
                Some(serde_json::Value::String(text)) => text.clone(),
                Some(serde_json::Value::Null) | None => "<not set>".to_string(),
                Some(other) => other.to_string(),
            },
        };
        lines.push((key.as_str(), shown));
    }

    lines
}

fn mask_secret(value: Option<&str>) -> String {
    match value {
        Some(token) if token.chars().count() > 6 => {
            let chars: Vec<char> = token.chars().collect();
            let prefix: String = chars[..3].iter().collect();
            let suffix: String = chars[chars.len() - 3..].iter().collect();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}
