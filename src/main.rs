//! tg-forward - Rule-driven message forwarding bridge
//!
//! Reads inbound message events as JSON lines on stdin and writes every
//! message that matches a rule as a JSON delivery line on stdout.
//!
//! # Usage
//!
//! ```bash
//! # Relay matching messages
//! echo '{"chat_id":-100,"text":"URGENT: db down"}' | tg-forward
//!
//! # Check which rules match a text
//! tg-forward --check "This is critical right now"
//!
//! # Inspect a portable session string
//! tg-forward --decode-session 1AgAAAAA...
//! ```

use std::io::{self, BufRead};
use std::path::Path;
use std::process;
use std::sync::mpsc;
use std::thread;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tg_forward::{
    audit::AuditLogger, session, Config, ForwardLoop, JsonFileRepository, MessageEvent,
    Normalizer, RuleService, WriterForwarder,
};

/// Print version information
fn print_version() {
    println!("tg-forward {}", env!("CARGO_PKG_VERSION"));
}

/// Print help message
fn print_help() {
    println!(
        r#"tg-forward - Rule-driven message forwarding bridge

USAGE:
    tg-forward [OPTIONS]

OPTIONS:
    -h, --help                  Print this help message
    -v, --version               Print version information
    -c, --config PATH           Path to config file
    -r, --rules PATH            Path to rules file (overrides config)
        --no-strip-diacritics   Match accents literally
        --check TEXT            Print the rules matching TEXT and exit
        --decode-session STR    Print the contents of a session string and exit

ENVIRONMENT:
    TG_BOT_TARGET_CHAT_ID       Target chat id
    TG_BOT_TARGET_USERNAME      Target channel username
    TG_USER_SESSION             Portable session string
    TG_FORWARD_RULES_PATH       Rules file path
    RUST_LOG                    Log filter (default from config)

INPUT:
    One JSON event per line on stdin:
    {{"chat_id": -1001234, "sender_id": 42, "text": "URGENT: db down"}}
"#
    );
}

/// Parse command line arguments
#[derive(Default)]
struct Args {
    help: bool,
    version: bool,
    config_path: Option<String>,
    rules_path: Option<String>,
    keep_diacritics: bool,
    check: Option<String>,
    decode_session: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut result = Args::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-h" | "--help" => result.help = true,
                "-v" | "--version" => result.version = true,
                "--no-strip-diacritics" => result.keep_diacritics = true,
                "-c" | "--config" => {
                    if i + 1 < args.len() {
                        i += 1;
                        result.config_path = Some(args[i].clone());
                    }
                }
                "-r" | "--rules" => {
                    if i + 1 < args.len() {
                        i += 1;
                        result.rules_path = Some(args[i].clone());
                    }
                }
                "--check" => {
                    if i + 1 < args.len() {
                        i += 1;
                        result.check = Some(args[i].clone());
                    }
                }
                "--decode-session" => {
                    if i + 1 < args.len() {
                        i += 1;
                        result.decode_session = Some(args[i].clone());
                    }
                }
                arg if arg.starts_with("--config=") => {
                    result.config_path = Some(arg.trim_start_matches("--config=").to_string());
                }
                arg if arg.starts_with("--rules=") => {
                    result.rules_path = Some(arg.trim_start_matches("--rules=").to_string());
                }
                _ => {}
            }
            i += 1;
        }

        result
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.general.log_level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn decode_session(input: &str) {
    match session::decode(input) {
        Ok(handle) => {
            let key_id: String = handle
                .auth_key_id()
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect();
            println!("dc_id: {}", handle.dc_id);
            println!("address: {}", handle.address);
            println!("auth_key_id: {}", key_id);
        }
        Err(e) => fail(format!("invalid session string: {}", e)),
    }
}

fn main() {
    let args = Args::parse();

    if args.help {
        print_help();
        return;
    }

    if args.version {
        print_version();
        return;
    }

    if let Some(ref input) = args.decode_session {
        decode_session(input);
        return;
    }

    // Load configuration
    let mut config = match args.config_path {
        Some(ref path) => Config::load_from(Path::new(path))
            .unwrap_or_else(|e| fail(format!("failed to load config from {}: {}", path, e))),
        None => Config::load(),
    };
    if let Err(e) = config.apply_env() {
        fail(e);
    }
    if let Some(path) = args.rules_path {
        config.rules.path = path;
    }
    if args.keep_diacritics {
        config.rules.strip_diacritics = false;
    }

    init_logging(&config);

    let normalizer: Normalizer = config.normalizer();
    let repo = JsonFileRepository::open(config.rules_path())
        .unwrap_or_else(|e| fail(format!("failed to initialize rules repository: {}", e)));
    let service = RuleService::new(repo, normalizer)
        .unwrap_or_else(|e| fail(format!("failed to initialize matcher: {}", e)));

    if let Some(text) = args.check {
        let matches = service.current_matcher().find_matches(&text);
        println!(
            "{}",
            serde_json::to_string(&matches).unwrap_or_else(|_| "[]".to_string())
        );
        return;
    }

    if let Err(e) = config.validate() {
        fail(e);
    }
    let target = match config.forward_target() {
        Ok(target) => target,
        Err(e) => fail(e),
    };

    if let Some(ref session_string) = config.session.string {
        match session::decode(session_string) {
            Ok(handle) => info!(
                dc_id = handle.dc_id,
                address = %handle.address,
                "using session from configuration"
            ),
            Err(e) => warn!(error = %e, "ignoring invalid session string"),
        }
    }

    let audit = AuditLogger::new(config.audit_path().as_deref());
    let forwarder = WriterForwarder::new(target, io::stdout());

    // Listener: one JSON event per stdin line, pushed in arrival order
    let (tx, rx) = mpsc::channel::<MessageEvent>();
    let reader = thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "failed to read input");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match MessageEvent::from_json(&line) {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "skipping malformed event"),
            }
        }
    });

    info!(
        rules = service.current_matcher().len(),
        target = %forwarder.target(),
        "forwarding started"
    );

    let stats = ForwardLoop::new(&service, forwarder)
        .ignore_sender(config.forward.ignore_sender_id)
        .with_audit(audit)
        .run(rx);

    if reader.join().is_err() {
        warn!("input reader panicked");
    }

    info!(
        received = stats.received,
        forwarded = stats.forwarded,
        skipped = stats.skipped,
        ignored = stats.ignored,
        failed = stats.failed,
        "shutdown complete"
    );
}
