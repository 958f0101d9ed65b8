#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line toolchain for the civic map application.
//!
//! ```text
//! cargo civic-map serve [--interactive]
//! cargo civic-map resolve --lat -26.2 --lng 28.0
//! cargo civic-map jurisdictions [--query gauteng]
//! cargo civic-map classify "there is a burst pipe on Main Road"
//! cargo civic-map migrate
//! cargo civic-map seed
//! cargo civic-map municipalities
//! cargo civic-map summary [--since 2025-01-01T00:00:00Z]
//! ```
//!
//! Running with no subcommand presents a menu of tools.

mod commands;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};

#[derive(Parser)]
#[command(name = "civic_map_cli", about = "Civic incident map toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Prompt for bind address, port and store first
        #[arg(long, short)]
        interactive: bool,
    },
    /// Resolve a coordinate to a jurisdiction
    Resolve {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// List catalog jurisdictions
    Jurisdictions {
        /// Case-insensitive name or province filter
        #[arg(long)]
        query: Option<String>,
    },
    /// Classify a voice-report transcript
    Classify {
        /// Speech-to-text transcript
        transcript: String,
    },
    /// Run database migrations
    Migrate,
    /// Run migrations and seed catalog municipalities
    Seed,
    /// List stored municipalities
    Municipalities,
    /// Print the incident dashboard summary
    Summary {
        /// Only incidents created at or after this instant (RFC 3339)
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// Only incidents created before this instant (RFC 3339)
        #[arg(long)]
        until: Option<DateTime<Utc>>,
    },
}

/// Top-level tool selection for the menu.
enum Tool {
    Server,
    Resolve,
    Jurisdictions,
    Classify,
    Migrate,
    Seed,
    Municipalities,
    Summary,
}

impl Tool {
    const ALL: &[Self] = &[
        Self::Server,
        Self::Resolve,
        Self::Jurisdictions,
        Self::Classify,
        Self::Migrate,
        Self::Seed,
        Self::Municipalities,
        Self::Summary,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Server => "Start server",
            Self::Resolve => "Resolve a location",
            Self::Jurisdictions => "Browse jurisdictions",
            Self::Classify => "Classify a voice report",
            Self::Migrate => "Run migrations",
            Self::Seed => "Seed municipalities",
            Self::Municipalities => "List stored municipalities",
            Self::Summary => "Incident summary",
        }
    }
}

/// Runs the server on actix-web's runtime.
async fn serve(interactive: bool) -> Result<(), Box<dyn std::error::Error>> {
    // The server uses actix-web's runtime, so we need to run it in a
    // blocking task to avoid nesting tokio runtimes.
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(async move {
            if interactive {
                civic_map_server::interactive::run().await
            } else {
                civic_map_server::run_server().await
            }
        })
    })
    .await??;
    Ok(())
}

async fn menu() -> Result<(), Box<dyn std::error::Error>> {
    println!("Civic Map Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Server => serve(true).await?,
        Tool::Resolve => {
            let lat: f64 = Input::new()
                .with_prompt("Latitude")
                .default(-26.2)
                .interact_text()?;
            let lng: f64 = Input::new()
                .with_prompt("Longitude")
                .default(28.0)
                .interact_text()?;
            commands::resolve(lat, lng)?;
        }
        Tool::Jurisdictions => {
            let query: String = Input::new()
                .with_prompt("Search (blank for all)")
                .allow_empty(true)
                .interact_text()?;
            let query = query.trim();
            commands::jurisdictions((!query.is_empty()).then_some(query))?;
        }
        Tool::Classify => {
            let transcript: String = Input::new()
                .with_prompt("Transcript")
                .interact_text()?;
            commands::classify(&transcript).await?;
        }
        Tool::Migrate => commands::migrate().await?,
        Tool::Seed => commands::seed().await?,
        Tool::Municipalities => commands::municipalities().await?,
        Tool::Summary => commands::summary(None, None).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return menu().await;
    };

    match command {
        Commands::Serve { interactive } => serve(interactive).await?,
        Commands::Resolve { lat, lng } => commands::resolve(lat, lng)?,
        Commands::Jurisdictions { query } => commands::jurisdictions(query.as_deref())?,
        Commands::Classify { transcript } => commands::classify(&transcript).await?,
        Commands::Migrate => commands::migrate().await?,
        Commands::Seed => commands::seed().await?,
        Commands::Municipalities => commands::municipalities().await?,
        Commands::Summary { since, until } => commands::summary(since, until).await?,
    }

    Ok(())
}
