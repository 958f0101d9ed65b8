#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the civic map application.
//!
//! Pass `--interactive` to be prompted for the bind address and port.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    if std::env::args().skip(1).any(|arg| arg == "--interactive" || arg == "-i") {
        return civic_map_server::interactive::run().await;
    }

    civic_map_server::run_server().await
}
