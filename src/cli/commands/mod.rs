use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
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

    Command::new("walletauth")
        .about("Replay wallet sessions through the headless login coordinator")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("script")
                .short('s')
                .long("script")
                .help("JSON file with the wallet and user events to replay")
                .env("WALLETAUTH_SCRIPT")
                .required(true),
        )
        .arg(
            Arg::new("origin")
                .short('o')
                .long("origin")
                .help("Origin the app is served from, used as signing domain and URI")
                .default_value("http://localhost:3000")
                .env("WALLETAUTH_ORIGIN"),
        )
        .arg(
            Arg::new("locale")
                .long("locale")
                .help("Locale sent with nonce requests, example: en-US")
                .env("WALLETAUTH_LOCALE"),
        )
        .arg(
            Arg::new("auto-login")
                .long("auto-login")
                .help("Log in automatically when the wallet connects")
                .env("WALLETAUTH_AUTO_LOGIN")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("auto-logout")
                .long("auto-logout")
                .help("Log out when the wallet disconnects or switches accounts")
                .env("WALLETAUTH_AUTO_LOGOUT")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .help("Emit logs as JSON")
                .env("WALLETAUTH_LOG_JSON")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("WALLETAUTH_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
