use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use crate::error::ServiceResult;
use crate::models::EventId;
use crate::service::{CreateEventRequest, EventService, UpdateEventRequest};

#[derive(Parser, Debug)]
#[command(name = "event-scheduler", version, about = "Event scheduler with upcoming-event reminders")]
pub struct Cli {
    /// KEY=VALUE settings file; unset keys fall back to the environment
    #[arg(long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the REST API and the reminder loop (default)
    Serve,
    #[command(flatten)]
    Event(EventCommand),
}

#[derive(Subcommand, Debug)]
pub enum EventCommand {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// daily, weekly, monthly or none
        #[arg(long)]
        recurring: Option<String>,
    },
    List,
    Show {
        id: EventId,
    },
    Update {
        id: EventId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        recurring: Option<String>,
    },
    Delete {
        id: EventId,
    },
    Search {
        query: String,
    },
    Upcoming {
        #[arg(long)]
        hours: Option<i64>,
    },
}

/// Runs one command against the store and returns what should be printed.
pub async fn execute(service: &EventService, command: EventCommand) -> ServiceResult<Value> {
    let output = match command {
        EventCommand::Add {
            title,
            description,
            start,
            end,
            recurring,
        } => {
            let event = service
                .create(CreateEventRequest {
                    title: Some(title),
                    description: Some(description),
                    start_time: Some(start),
                    end_time: Some(end),
                    recurring,
                })
                .await?;
            json!({ "event": event })
        }
        EventCommand::List => json!({ "events": service.list().await }),
        EventCommand::Show { id } => json!({ "event": service.get(id).await? }),
        EventCommand::Update {
            id,
            title,
            description,
            start,
            end,
            recurring,
        } => {
            let event = service
                .update(
                    id,
                    UpdateEventRequest {
                        title,
                        description,
                        start_time: start,
                        end_time: end,
                        recurring,
                    },
                )
                .await?;
            json!({ "event": event })
        }
        EventCommand::Delete { id } => {
            service.delete(id).await?;
            json!({ "deleted": id })
        }
        EventCommand::Search { query } => json!({ "events": service.search(&query).await? }),
        EventCommand::Upcoming { hours } => json!({ "events": service.upcoming(hours).await? }),
    };
    Ok(output)
}
