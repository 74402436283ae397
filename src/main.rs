#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use ride_handoff::{
    handoff::{AppShell, BrowserSession, BrowserSessionResult, OutcomeRouter},
    Destination, HandoffCoordinator, HandoffSettings, HttpExchangeClient, Platform,
    PlatformDispatcher, SessionState, SignInProgress,
};

/// Browser session driven from the terminal: the user opens the printed URL
/// and pastes back the deep link the provider redirected to.
struct TerminalBrowserSession;

#[async_trait]
impl BrowserSession for TerminalBrowserSession {
    async fn open_auth_session(&self, auth_url: &str, redirect_uri: &str) -> BrowserSessionResult {
        println!("Open this URL in your browser to sign in:");
        println!("  {auth_url}");
        println!();
        println!("Paste the {redirect_uri} link you are sent back to (empty line to cancel):");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        match lines.next_line().await {
            Ok(Some(line)) if !line.trim().is_empty() => BrowserSessionResult::Success {
                url: line.trim().to_string(),
            },
            Ok(Some(_)) => BrowserSessionResult::Cancel,
            Ok(None) | Err(_) => BrowserSessionResult::Dismiss,
        }
    }
}

/// Prints navigation and alerts instead of rendering screens
struct ConsoleShell;

impl AppShell for ConsoleShell {
    fn navigate(&self, destination: &Destination) {
        match destination {
            Destination::Registration(prefill) => {
                println!("→ Registration ({} sign-up)", prefill.auth_provider);
                println!("  email: {}", prefill.email);
                println!("  name:  {}", prefill.name);
            }
            Destination::DriverHome => println!("→ Driver home"),
            Destination::RiderHome => println!("→ Rider home"),
        }
    }

    fn show_alert(&self, title: &str, message: &str) {
        eprintln!("⚠️  {title}: {message}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings =
        HandoffSettings::load().map_err(|e| anyhow!("Failed to load settings: {e}"))?;

    if settings.application.platform == Platform::Web {
        bail!("Web builds re-enter through the page; this binary runs the native flow");
    }

    let exchanger = HttpExchangeClient::from_settings(&settings)
        .context("Failed to initialize exchange client")?;
    print_startup_info(&settings, exchanger.endpoint());

    let session = SessionState::new();
    let coordinator = HandoffCoordinator::new(
        PlatformDispatcher::native(Arc::new(TerminalBrowserSession), &settings),
        Arc::new(exchanger),
        OutcomeRouter::new(
            Arc::new(ConsoleShell),
            session.clone(),
            &settings.identity_provider.name,
        ),
    );

    // A deep link handed over by the OS goes straight into the pipeline
    let destination = if let Some(callback_url) = std::env::args().nth(1) {
        coordinator.handle_callback(&callback_url).await
    } else {
        match coordinator.sign_in().await {
            SignInProgress::Finished(destination) => destination,
            SignInProgress::Cancelled => {
                println!("Sign-in cancelled");
                None
            }
            SignInProgress::Dismissed => {
                println!("Sign-in dismissed");
                None
            }
            SignInProgress::Redirected | SignInProgress::AlreadyInProgress => None,
        }
    };

    if destination.is_some() && session.is_authenticated() {
        println!("✓ Signed in");
    }
    Ok(())
}

fn print_startup_info(settings: &HandoffSettings, exchange_endpoint: &str) {
    println!(
        "ride-handoff {} ({} platform)",
        ride_handoff::VERSION,
        settings.application.platform
    );
    println!("Identity provider: {}", settings.identity_provider.name);
    println!("Exchange endpoint: {exchange_endpoint}");
    println!(
        "Exchange timeout:  {}s",
        settings.backend.exchange_timeout_seconds
    );
    println!();
}
