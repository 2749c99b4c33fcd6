use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead};
use std::net::TcpListener;
use std::process;
use std::sync::Arc;

use blockfs::block_device::block_device::BlockDevice;
use blockfs::block_device::file_device::FileDevice;
use blockfs::config::{MAX_PASSWORD, MAX_USERNAME};
use blockfs::manager::fs::BlockFs;
use log::{info, warn};
use netfs::server::{self, ServerContext};
use netfs::session::SessionTable;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("usage: {} [port]", args[0]);
        process::exit(1);
    }
    let port: u16 = match args.get(1) {
        Some(arg) => arg.parse().unwrap_or_else(|_| {
            eprintln!("bad port {:?}", arg);
            process::exit(1);
        }),
        None => 0,
    };

    let credentials = read_credentials(io::stdin().lock());
    info!("{} users loaded", credentials.len());

    let disk_path = env::var("NETFS_DISK").unwrap_or_else(|_| "fs.img".to_string());
    let device = FileDevice::open(&disk_path).unwrap_or_else(|e| {
        eprintln!("cannot open disk image {:?}: {}", disk_path, e);
        process::exit(1);
    });
    let device: Arc<dyn BlockDevice> = Arc::new(device);
    if !BlockFs::is_formatted(&device) {
        info!("disk image {:?} is empty, formatting", disk_path);
        BlockFs::format(&device);
    }
    let fs = BlockFs::mount(device).unwrap_or_else(|code| {
        eprintln!("corrupt disk image {:?}: error {}", disk_path, code);
        process::exit(1);
    });

    let listener = TcpListener::bind(("0.0.0.0", port)).unwrap_or_else(|e| {
        eprintln!("cannot bind port {}: {}", port, e);
        process::exit(1);
    });
    let port = listener
        .local_addr()
        .unwrap_or_else(|e| {
            eprintln!("cannot read bound address: {}", e);
            process::exit(1);
        })
        .port();
    println!("\n@@@ port {}", port);

    server::run(
        listener,
        Arc::new(ServerContext {
            fs,
            sessions: SessionTable::new(),
            credentials,
        }),
    );
}

/// Whitespace-separated `username password` pairs, one per line, until
/// EOF. Oversized or incomplete entries are skipped.
fn read_credentials(reader: impl BufRead) -> HashMap<String, String> {
    let mut credentials = HashMap::new();
    for line in reader.lines() {
        let Ok(line) = line else { break };
        let mut fields = line.split_whitespace();
        let (Some(user), Some(password)) = (fields.next(), fields.next()) else {
            continue;
        };
        if user.len() > MAX_USERNAME || password.len() > MAX_PASSWORD {
            warn!("skipping oversized credential entry for {:?}", user);
            continue;
        }
        credentials.insert(user.to_string(), password.to_string());
    }
    credentials
}
