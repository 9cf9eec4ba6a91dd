use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

pub(crate) enum RunOutcome {
    Serve(SocketAddr, stillbell::config::AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }

    let addr = match resolve_listen_addr(&cli.listen) {
        Ok(addr) => addr,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    if cli.store.is_none() {
        eprintln!("warning: running without --store; subscriptions will not survive a restart");
    }

    RunOutcome::Serve(
        addr,
        stillbell::config::AppConfig {
            store_path: cli.store,
            vapid_private_key: cli.vapid_private_key,
            vapid_public_key: cli.vapid_public_key,
            vapid_subject: cli.vapid_subject,
        },
    )
}

#[derive(Parser, Debug)]
#[command(name = "stillbell", version, about = "Web push reminder server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "STILLBELL_STORE")]
    store: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:8787")]
    listen: String,
    #[arg(long, env = "STILLBELL_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "STILLBELL_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "STILLBELL_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = stillbell::generate_vapid_credentials();
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("STILLBELL_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("STILLBELL_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("STILLBELL_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace STILLBELL_VAPID_SUBJECT with a contact URI you control.");
    }
    println!();
    println!(
        "--vapid-private-key \"{}\" --vapid-public-key \"{}\" --vapid-subject \"{subject}\"",
        credentials.private_key, credentials.public_key
    );
    0
}

fn resolve_listen_addr(raw: &str) -> Result<SocketAddr, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("invalid listen address '{raw}'; expected host:port"))
}
