use std::{
    env, fs,
    io::{self, BufRead, Write},
    path::PathBuf,
    process,
    sync::Arc,
};

use tracing::info;

use lnboard::{
    config::{config_folder_path, Config, ConfigError},
    logger,
    provider::{
        client::{jsonrpc::JsonRPCClient, Gateway},
        WalletProvider,
    },
    store::FileStore,
    wizard::{OnboardingState, Wizard, STAGES},
    VERSION,
};

fn print_help_exit(code: i32) {
    eprintln!("lnboard version {}", VERSION);
    eprintln!("Guides you through funding your lightning node and opening a first channel, through your wallet provider.");
    eprintln!("By default lnboard looks for a 'lnboard.toml' file in its data directory. A different one may be provided like so: '--conf <config file path>'.");
    process::exit(code);
}

fn print_version() {
    eprintln!("{}", VERSION);
    process::exit(0);
}

fn parse_args(args: Vec<String>) -> Option<PathBuf> {
    if args.len() == 1 {
        return None;
    }

    if args[1] == "--help" || args[1] == "-h" {
        print_help_exit(0)
    } else if args[1] == "--version" || args[1] == "-v" {
        print_version()
    } else if args[1] != "--conf" {
        eprintln!("Only a single command line argument is supported: --conf. All other configuration parameters must be specified in the configuration file.");
        print_help_exit(1);
    }

    if args.len() != 3 {
        print_help_exit(1);
    }

    Some(PathBuf::from(args[2].to_owned()))
}

fn render(wizard: &Wizard) {
    println!();
    println!("=== {} ===", STAGES[wizard.stage_index()]);
    match wizard.state() {
        OnboardingState::AwaitingWallet => {
            println!("No wallet provider was found.");
            println!("  1. Get a lightning node.");
            println!("  2. Connect a wallet provider to it and let it listen on its socket.");
            println!("Once the above steps are done, please run lnboard again.");
        }
        OnboardingState::CapabilityMissing => {
            println!("Your wallet provider does not accept the remote methods we need (walletbalance, newaddress).");
            println!("Switch to an account backed by an LND node and run lnboard again.");
        }
        OnboardingState::AwaitingFunds { balance, address } => {
            println!(
                "Please send at least {} sats to your node and wait for onchain confirmation.",
                wizard.minimum_funding_sats().unwrap_or(0)
            );
            println!("Here's a deposit address: {}", address);
            println!("Confirmed balance: {} sats", balance.confirmed);
            println!("Unconfirmed balance: {} sats", balance.unconfirmed);
        }
        OnboardingState::ReadyToConnect {
            balance,
            eligible,
            error,
        } => {
            if let Some(error) = error {
                println!("{}", error);
                println!();
            }
            println!("Confirmed balance: {} sats", balance.confirmed);
            println!("Recommended nodes:");
            for (i, target) in eligible.iter().enumerate() {
                println!("  {}. {}", i + 1, target.title);
                println!("     {}@{}", target.pubkey, target.host);
            }
        }
        OnboardingState::ChannelOpening { funding_txid } => {
            println!("Channel opening!");
            println!("Please wait for a few onchain confirmations and you'll be able to make payments.");
            println!("https://mempool.space/tx/{}", funding_txid);
        }
        OnboardingState::Failed(error) => {
            println!("Connection error: {}", error);
        }
    }
}

fn read_line(stdin: &io::Stdin) -> Option<String> {
    if io::stdout().flush().is_err() {
        return None;
    }
    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = env::args().collect();
    let conf_path = parse_args(args);
    let config = match Config::from_file(conf_path.clone()) {
        Ok(config) => config,
        // Without an explicit --conf, a missing file just means defaults.
        Err(ConfigError::FileNotFound) if conf_path.is_none() => Config::default(),
        Err(e) => {
            eprintln!("Error reading configuration: {}", e);
            process::exit(1);
        }
    };

    let datadir = match config.data_dir.clone().or_else(config_folder_path) {
        Some(datadir) => datadir,
        None => {
            eprintln!("Could not locate a data directory.");
            process::exit(1);
        }
    };
    if let Err(e) = fs::create_dir_all(&datadir) {
        eprintln!("Error creating data directory '{}': {}", datadir.display(), e);
        process::exit(1);
    }

    let log_level = match logger::parse_log_level() {
        Ok(Some(level)) => level,
        Ok(None) => config.log_level,
        Err(e) => {
            eprintln!("Error getting log level: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = logger::setup_logger(log_level, &datadir) {
        eprintln!("Error setting up logger: {}", e);
        process::exit(1);
    }

    let socket_path = config
        .provider_config
        .as_ref()
        .map(|p| p.socket_path.clone())
        .unwrap_or_else(|| datadir.join("provider.sock"));
    let provider: Option<Arc<dyn WalletProvider>> = if socket_path.exists() {
        info!("using wallet provider at '{}'", socket_path.display());
        Some(Arc::new(Gateway::new(JsonRPCClient::new(&socket_path))))
    } else {
        info!("no wallet provider socket at '{}'", socket_path.display());
        None
    };

    let store = Arc::new(FileStore::new(&datadir));
    let mut wizard = Wizard::new(provider, store);
    wizard.initialize().await;

    let stdin = io::stdin();
    loop {
        render(&wizard);

        if matches!(
            wizard.state(),
            OnboardingState::AwaitingWallet
                | OnboardingState::CapabilityMissing
                | OnboardingState::ChannelOpening { .. }
                | OnboardingState::Failed(..)
        ) {
            return;
        }

        if matches!(wizard.state(), OnboardingState::AwaitingFunds { .. }) {
            print!("Press enter once your deposit confirmed, or 'q' to quit: ");
            match read_line(&stdin).as_deref() {
                None | Some("q") => return,
                Some(_) => wizard.initialize().await,
            }
            continue;
        }

        // Ready to connect: pick a recommended node or enter one by hand.
        print!("Node number to connect to, '<pubkey> <host>', or 'q' to quit: ");
        let line = match read_line(&stdin) {
            None => return,
            Some(line) => line,
        };
        if line == "q" {
            return;
        }
        if let Ok(choice) = line.parse::<usize>() {
            if choice < 1 {
                continue;
            }
            wizard.select_target(choice - 1);
        } else {
            let mut words = line.split_whitespace();
            match (words.next(), words.next()) {
                (Some(pubkey), Some(host)) => wizard.set_peer(pubkey, host),
                _ => continue,
            }
        }
        wizard.open_channel().await;
    }
}
