//! Interactive mode for the server.
//!
//! Prompts the user for bind address, port and incident store before
//! starting the server.

use dialoguer::{Confirm, Input, Select};

use crate::config::StoreKind;

/// Runs the server in interactive mode, prompting for configuration.
///
/// Asks the user for a bind address, port and store, sets the
/// corresponding environment variables (`BIND_ADDR`, `PORT`,
/// `CIVIC_MAP_STORE`), and delegates to
/// [`super::run_server`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Civic Map Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default("127.0.0.1".to_string())
        .interact_text()
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port_str: String = Input::new()
        .with_prompt("Port")
        .default("8080".to_string())
        .validate_with(|input: &String| {
            input
                .parse::<u16>()
                .map(|_| ())
                .map_err(|_| "Port must be a number between 0 and 65535")
        })
        .interact_text()
        .unwrap_or_else(|_| "8080".to_string());

    let store = Select::new()
        .with_prompt("Incident store")
        .items(&["Postgres (DATABASE_URL)", "In-memory"])
        .default(0)
        .interact()
        .unwrap_or(0);
    let store_kind = if store == 1 {
        StoreKind::Memory
    } else {
        StoreKind::Postgres
    };

    // SAFETY: We are single-threaded at this point (before server starts) and
    // these variables are only read once during server initialisation.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", &port_str);
        std::env::set_var("CIVIC_MAP_STORE", store_kind.as_ref());
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port_str}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}
