use crate::auth::{self, LoginOutcome};
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::config::{AdminCredential, AppConfig};
use crate::core::Core;
use crate::error::Error;
use crate::mfa::challenge::MfaChallenge;
use crate::mfa::enrollment::MfaEnrollment;
use crate::notify::ChannelEvent;
use crate::session::{SessionScope, inventory};
use anyhow::{Context, Result, bail};
use secrecy::ExposeSecret;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

/// Handle the resolved action.
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    let admin = match (&globals.admin_id, &globals.admin_secret) {
        (Some(id), Some(secret)) => Some(AdminCredential {
            id: id.clone(),
            secret: secret.clone(),
        }),
        _ => None,
    };
    let config = AppConfig::new(globals.api_url.clone(), globals.ws_url.clone(), admin);
    let core = Arc::new(Core::new(config)?);

    // Seed the token store from a previous login so the authenticated
    // subcommands work across invocations.
    if let (Some(token), Some(identity)) = (&globals.token, &globals.identity) {
        core.install_session(token.clone(), SessionScope::Durable, identity.clone());
    }

    match action {
        Action::Login {
            email,
            password,
            ephemeral,
            otp,
        } => login(&core, &email, password, ephemeral, otp).await,
        Action::Sessions => sessions(&core).await,
        Action::Revoke { token } => revoke(&core, &token).await,
        Action::MfaSetup => mfa_setup(&core).await,
        Action::MfaDisable => mfa_disable(&core).await,
        Action::Watch => watch(&core).await,
        Action::Publish {
            destination,
            message,
        } => publish(&core, &destination, &message).await,
    }
}

async fn login(
    core: &Arc<Core>,
    email: &str,
    password: secrecy::SecretString,
    ephemeral: bool,
    otp: Option<String>,
) -> Result<()> {
    let scope = if ephemeral {
        SessionScope::Ephemeral
    } else {
        SessionScope::Durable
    };

    match auth::login(core, email, password, scope).await? {
        LoginOutcome::SignedIn => {}
        LoginOutcome::MfaRequired(context) => {
            let Some(code) = otp else {
                bail!("a second factor is required; re-run with --otp <code>");
            };
            let mut challenge = MfaChallenge::new(core.clone(), context, scope);
            challenge.submit(&code).await?;
        }
    }

    let session = core.store.read().context("no session after login")?;
    println!("signed in as {}", session.identity());
    println!("export CUSTODIA_TOKEN={}", session.token().expose_secret());
    println!("export CUSTODIA_IDENTITY={}", session.identity());
    Ok(())
}

async fn sessions(core: &Arc<Core>) -> Result<()> {
    let records = inventory::list(core).await?;
    if records.is_empty() {
        println!("no active sessions");
        return Ok(());
    }
    for record in records {
        let marker = if record.is_current { "*" } else { " " };
        println!(
            "{marker} {}  {}  {}  {}  {}",
            record.token, record.login_time, record.device_info, record.ip_address, record.location
        );
    }
    println!("(* = this session)");
    Ok(())
}

async fn revoke(core: &Arc<Core>, token: &str) -> Result<()> {
    let was_current = core.store.matches_token(token);
    inventory::revoke(core, token).await?;
    if was_current {
        println!("revoked this session; signed out");
    } else {
        println!("revoked");
    }
    Ok(())
}

async fn mfa_setup(core: &Arc<Core>) -> Result<()> {
    let mut enrollment = MfaEnrollment::new(core.clone(), false);
    let secret = enrollment.begin().await?;

    println!("scan the QR code or add the secret manually:");
    println!("  secret:  {}", secret.secret);
    println!("  otpauth: {}", secret.otp_auth_url);
    println!("  qr:      {}", secret.qr_url);
    enrollment.proceed_to_verify()?;

    loop {
        let code = prompt("enter the six-digit code (empty to cancel): ")?;
        if code.is_empty() {
            enrollment.cancel();
            println!("enrollment cancelled");
            return Ok(());
        }
        match enrollment.submit_code(&code).await {
            Ok(()) => {
                println!("second factor enabled");
                return Ok(());
            }
            // Both leave the flow in AwaitingCode for another try.
            Err(Error::InvalidCredential) => println!("code rejected, try again"),
            Err(Error::Validation(message)) => println!("{message}"),
            Err(err) => return Err(err.into()),
        }
    }
}

async fn mfa_disable(core: &Arc<Core>) -> Result<()> {
    let mut enrollment = MfaEnrollment::new(core.clone(), true);
    enrollment.disable().await?;
    println!("second factor disabled");
    Ok(())
}

async fn watch(core: &Arc<Core>) -> Result<()> {
    if core.store.read().is_none() {
        bail!("sign in first: watch needs an identity to subscribe for");
    }

    let mut events = core.channel.subscribe_events();
    core.channel.connect();
    println!("watching for notifications, press ctrl-c to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ChannelEvent::Connected) => {
                    if let Some(topic) = core.channel.subscribed_topic() {
                        println!("subscribed to {topic}");
                    }
                }
                Ok(ChannelEvent::Notification(notification)) => {
                    println!("{}: {}", notification.destination, notification.body);
                }
                Ok(ChannelEvent::TransportError(message)) => {
                    eprintln!("transport error: {message}");
                }
                // Dropped messages or a torn-down channel both mean resubscribe.
                Err(_) => break,
            }
        }
    }

    core.channel.disconnect();
    Ok(())
}

async fn publish(core: &Arc<Core>, destination: &str, message: &str) -> Result<()> {
    if core.store.read().is_none() {
        bail!("sign in first: publish needs an identity");
    }

    let mut events = core.channel.subscribe_events();
    core.channel.connect();

    // Wait for the subscription to come up before publishing.
    let connected = tokio::time::timeout(Duration::from_secs(10), async {
        while let Ok(event) = events.recv().await {
            if matches!(event, ChannelEvent::Connected) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);

    if !connected {
        core.channel.disconnect();
        bail!("could not reach the message broker");
    }

    let attempted = core.channel.publish(destination, message);
    // The frame is queued to the writer task; give it a moment to flush
    // before tearing the connection down.
    tokio::time::sleep(Duration::from_millis(200)).await;
    core.channel.disconnect();
    if attempted {
        println!("published to {destination}");
        Ok(())
    } else {
        bail!("publish was refused; channel not connected")
    }
}

fn prompt(text: &str) -> Result<String> {
    print!("{text}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
