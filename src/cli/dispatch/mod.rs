use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{Context, Result};
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<(GlobalArgs, Action)> {
    let mut globals = GlobalArgs::new(
        matches
            .get_one::<String>("api-url")
            .map(String::to_string)
            .context("missing required argument: --api-url")?,
    );
    globals.ws_url = matches.get_one::<String>("ws-url").map(String::to_string);
    globals.admin_id = matches.get_one::<String>("admin-id").map(String::to_string);
    globals.admin_secret = matches
        .get_one::<String>("admin-secret")
        .map(|s| SecretString::from(s.clone()));
    globals.token = matches
        .get_one::<String>("token")
        .map(|s| SecretString::from(s.clone()));
    globals.identity = matches.get_one::<String>("identity").map(String::to_string);

    let (name, sub) = matches
        .subcommand()
        .context("a subcommand is required")?;

    let action = match name {
        "login" => Action::Login {
            email: required(sub, "email")?,
            password: SecretString::from(required(sub, "password")?),
            ephemeral: sub.get_flag("ephemeral"),
            otp: sub.get_one::<String>("otp").map(String::to_string),
        },
        "sessions" => Action::Sessions,
        "revoke" => Action::Revoke {
            token: required(sub, "session-token")?,
        },
        "mfa-setup" => Action::MfaSetup,
        "mfa-disable" => Action::MfaDisable,
        "watch" => Action::Watch,
        "publish" => Action::Publish {
            destination: required(sub, "destination")?,
            message: required(sub, "message")?,
        },
        other => anyhow::bail!("unknown subcommand: {other}"),
    };

    Ok((globals, action))
}

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .map(String::to_string)
        .with_context(|| format!("missing required argument: --{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn handler_builds_login_action() -> Result<()> {
        let matches = commands::new().try_get_matches_from([
            "custodia",
            "--api-url",
            "http://localhost:9999",
            "login",
            "--email",
            "a@custodia.dev",
            "--password",
            "secret",
            "--ephemeral",
        ])?;

        let (globals, action) = handler(&matches)?;
        assert_eq!(globals.api_url, "http://localhost:9999");
        match action {
            Action::Login {
                email, ephemeral, ..
            } => {
                assert_eq!(email, "a@custodia.dev");
                assert!(ephemeral);
            }
            _ => anyhow::bail!("expected login action"),
        }
        Ok(())
    }

    #[test]
    fn handler_builds_publish_action() -> Result<()> {
        let matches = commands::new().try_get_matches_from([
            "custodia", "publish", "alerts", "hello there",
        ])?;

        let (_globals, action) = handler(&matches)?;
        match action {
            Action::Publish {
                destination,
                message,
            } => {
                assert_eq!(destination, "alerts");
                assert_eq!(message, "hello there");
            }
            _ => anyhow::bail!("expected publish action"),
        }
        Ok(())
    }
}
