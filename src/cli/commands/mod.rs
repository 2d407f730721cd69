use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::{
        ValueParser,
        styling::{AnsiColor, Effects, Styles},
    },
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("custodia")
        .about("Session and real-time notification core")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Dashboard API base URL")
                .default_value("http://localhost:8080")
                .env("CUSTODIA_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("ws-url")
                .long("ws-url")
                .help("Broker WebSocket base URL, derived from the API URL when omitted")
                .env("CUSTODIA_WS_URL")
                .global(true),
        )
        .arg(
            Arg::new("admin-id")
                .long("admin-id")
                .help("Administrative identity for admin-plane requests")
                .env("CUSTODIA_ADMIN_ID")
                .global(true),
        )
        .arg(
            Arg::new("admin-secret")
                .long("admin-secret")
                .help("Administrative secret for admin-plane requests")
                .env("CUSTODIA_ADMIN_SECRET")
                .global(true),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .help("Session token issued by a previous login")
                .env("CUSTODIA_TOKEN")
                .global(true),
        )
        .arg(
            Arg::new("identity")
                .long("identity")
                .help("Email of the identity owning the session token")
                .env("CUSTODIA_IDENTITY")
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("CUSTODIA_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("login")
                .about("Primary credential check, completing the MFA challenge when required")
                .arg(
                    Arg::new("email")
                        .long("email")
                        .help("Account email")
                        .required(true),
                )
                .arg(
                    Arg::new("password")
                        .long("password")
                        .help("Account password")
                        .env("CUSTODIA_PASSWORD")
                        .required(true),
                )
                .arg(
                    Arg::new("ephemeral")
                        .long("ephemeral")
                        .help("Do not keep the session across a restart of the shell")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("otp")
                        .long("otp")
                        .help("One-time code, required when the account has a second factor"),
                ),
        )
        .subcommand(Command::new("sessions").about("List active sessions, this session first"))
        .subcommand(
            Command::new("revoke")
                .about("Revoke a single session by token")
                .arg(
                    Arg::new("session-token")
                        .help("Token of the session to revoke")
                        .required(true),
                ),
        )
        .subcommand(Command::new("mfa-setup").about("Enroll a TOTP second factor"))
        .subcommand(Command::new("mfa-disable").about("Disable the TOTP second factor"))
        .subcommand(Command::new("watch").about("Stream notifications for the signed-in identity"))
        .subcommand(
            Command::new("publish")
                .about("Publish a message to a named destination")
                .arg(Arg::new("destination").required(true))
                .arg(Arg::new("message").required(true)),
        )
}
