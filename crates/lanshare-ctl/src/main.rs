//! lanshare-ctl — command-line interface for the LanShare daemon.

use anyhow::{Context, Result};

mod cmd;

use cmd::{files, identity, peers};

const DEFAULT_PORT: u16 = 19001;

fn print_usage() {
    println!("Usage: lanshare-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  identity                         Show this node's name, port, and address");
    println!("  identity set <name>              Change the announced username");
    println!("  peers                            List discovered peers");
    println!("  files                            List files this node shares");
    println!("  share <path> [--password <pw>]   Upload and share a file");
    println!("  unshare <file-id>                Stop sharing a file");
    println!("  remote <address> <port>          List a peer's shared files");
    println!("  download <address> <port> <file-id> [--password <pw>] [--out <path>]");
    println!("                                   Download a file from a peer");
    println!();
    println!("Options:");
    println!("  --port <port>   Local daemon port (default: {})", DEFAULT_PORT);
}

fn parse_peer_port(raw: &str) -> Result<u16> {
    raw.parse()
        .with_context(|| format!("invalid peer port: {}", raw))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse options; everything else is the command.
    let mut port = DEFAULT_PORT;
    let mut password: Option<String> = None;
    let mut out: Option<String> = None;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                port = args
                    .get(i)
                    .context("--port requires a value")?
                    .parse()
                    .context("--port must be a number")?;
            }
            "--password" => {
                i += 1;
                password = Some(args.get(i).context("--password requires a value")?.clone());
            }
            "--out" => {
                i += 1;
                out = Some(args.get(i).context("--out requires a value")?.clone());
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    let password = password.as_deref();
    let out = out.as_deref();

    match remaining.as_slice() {
        ["identity"] | []                          => identity::cmd_identity(port).await,
        ["identity", "set", name]                  => identity::cmd_identity_set(port, name).await,
        ["peers"]                                  => peers::cmd_peers(port).await,
        ["files"]                                  => files::cmd_files(port).await,
        ["share", path]                            => files::cmd_share(port, path, password).await,
        ["unshare", id]                            => files::cmd_unshare(port, id).await,
        ["remote", addr, peer_port]                => {
            files::cmd_remote(port, addr, parse_peer_port(peer_port)?).await
        }
        ["download", addr, peer_port, id]          => {
            files::cmd_download(port, addr, parse_peer_port(peer_port)?, id, password, out).await
        }
        ["help"] | ["--help"] | ["-h"]             => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
