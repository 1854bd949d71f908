use log::error;
use std::env;
use std::process;

use rax_ftp_engine::client::RaxFtpClient;
use rax_ftp_engine::config::ClientConfig;
use rax_ftp_engine::terminal::Terminal;

fn main() {
    // Initialize logging
    env_logger::init();

    // Optional config file path, overridden by RAX_FTP_* variables
    let config_path = env::args().nth(1);
    let config = match ClientConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            print_usage();
            process::exit(1);
        }
    };

    let logon = match config.logon_info() {
        Ok(logon) => logon,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let mut client = RaxFtpClient::from_settings(&config.client);
    if !client.login(&logon) {
        error!("Logon to {} failed", config.display_name());
        eprintln!("Failed to log on to {}", config.display_name());
        process::exit(1);
    }

    let mut terminal = Terminal::new(client, config);
    if let Err(e) = terminal.run_interactive() {
        eprintln!("Terminal error: {}", e);
        process::exit(1);
    }
}

fn print_usage() {
    println!("RAX FTP Client");
    println!("Usage: rax-ftp [config.toml]");
    println!("Environment Variables:");
    println!("  RAX_FTP_SERVER__HOST=127.0.0.1");
    println!("  RAX_FTP_SERVER__PORT=21");
    println!("  RAX_FTP_SERVER__USER=anonymous");
    println!("  RAX_FTP_FIREWALL__TYPE=USER_AFTER_LOGON");
    println!("  RAX_FTP_CLIENT__PASSIVE=true");
    println!("  RAX_FTP_CLIENT__LOCAL_DIRECTORY=\"./downloads\"");
    println!("  RUST_LOG=info");
}
