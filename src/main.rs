use clap::Parser;
use messageu::{
    ClientConfig, ClientId, CryptoProvider, Error, HandshakeOrchestrator, Identity, Incoming,
    ReceivedMessage, RustCryptoProvider, TcpTransport,
};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

type Client = HandshakeOrchestrator<TcpTransport, RustCryptoProvider>;

#[derive(Parser, Debug)]
#[command(name = "messageu")]
#[command(about = "MessageU end-to-end encrypted messaging client")]
struct Cli {
    /// Relay address as host:port. Overrides server.info.
    #[arg(long, env = "MESSAGEU_SERVER")]
    server: Option<String>,

    #[arg(long, default_value = "server.info")]
    server_info: PathBuf,

    #[arg(long, default_value = "my.info")]
    my_info: PathBuf,

    /// Where received files are written. Defaults to the system temp dir.
    #[arg(long)]
    download_dir: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        let mut config = ClientConfig {
            server: defaults.server,
            server_info_path: self.server_info,
            my_info_path: self.my_info,
            download_dir: self.download_dir.unwrap_or(defaults.download_dir),
        };

        match self.server {
            Some(server) => config.server = server,
            None => {
                if let Err(e) = config.load_server_info() {
                    warn!(error = %e, server = %config.server, "using default server");
                }
            }
        }
        config
    }
}

const MENU: &str = "
MessageU client at your service.

110) Register
120) Request for clients list
130) Request for public key
140) Request for waiting messages
150) Send a text message
151) Send a request for symmetric key
152) Send your symmetric key
153) Send a file
0) Exit client
?";

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Cli::parse().into_config();
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Fatal error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &ClientConfig) -> Result<(), Error> {
    let crypto = RustCryptoProvider::new();
    let identity = Identity::load(&config.my_info_path, &crypto)?;
    if let Some(identity) = &identity {
        println!("Welcome back, {}.", identity.username);
    }

    let transport = TcpTransport::new(&config.server);
    let mut client = HandshakeOrchestrator::new(transport, crypto, identity);
    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        let Some(choice) = prompt(&mut input, MENU)? else {
            return Ok(());
        };
        let result = match choice.as_str() {
            "110" => register(&mut client, &mut input, config),
            "120" => list_clients(&mut client),
            "130" => show_public_key(&mut client, &mut input),
            "140" => show_waiting_messages(&mut client, config),
            "150" => send_text(&mut client, &mut input),
            "151" => with_peer(&mut client, &mut input, |client, peer| {
                client.request_symmetric_key(peer).map(|_| ())
            }),
            "152" => with_peer(&mut client, &mut input, |client, peer| {
                client.send_symmetric_key(peer).map(|_| ())
            }),
            "153" => send_file(&mut client, &mut input),
            "0" => return Ok(()),
            other => {
                println!("Unknown option {other:?}");
                continue;
            }
        };

        match result {
            Ok(()) => {}
            Err(Error::ServerRejected) => println!("server responded with an error"),
            Err(e) => println!("Error: {e}"),
        }
    }
}

/// Prints `message` and reads one trimmed line. `None` on end of input.
fn prompt(input: &mut impl BufRead, message: &str) -> Result<Option<String>, Error> {
    println!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Like [`prompt`], but an empty answer or end of input is an error.
fn prompt_required(
    input: &mut impl BufRead,
    message: &str,
    what: &'static str,
) -> Result<String, Error> {
    prompt(input, message)?
        .filter(|line| !line.is_empty())
        .ok_or(Error::MissingInput(what))
}

fn register(
    client: &mut Client,
    input: &mut impl BufRead,
    config: &ClientConfig,
) -> Result<(), Error> {
    let username = prompt_required(input, "Enter username:", "username")?;
    let id = client.register(&username)?;

    if let Some(identity) = client.identity() {
        identity.save(&config.my_info_path, client.crypto())?;
    }
    println!("Registered as {username} with id {id}");
    Ok(())
}

fn list_clients(client: &mut Client) -> Result<(), Error> {
    let directory = client.client_list()?;
    if directory.is_empty() {
        println!("No other clients registered.");
    }
    for peer in directory.peers() {
        println!("{}  {}", peer.id, peer.name);
    }
    Ok(())
}

fn show_public_key(client: &mut Client, input: &mut impl BufRead) -> Result<(), Error> {
    let name = prompt_required(input, "Enter username:", "username")?;
    let peer = client.find_peer(&name)?;
    let response = client.fetch_public_key(peer.id)?;

    println!("Public key of {name}:");
    println!("{}", client.crypto().base64_encode(response.public_key.as_bytes()));
    Ok(())
}

fn show_waiting_messages(client: &mut Client, config: &ClientConfig) -> Result<(), Error> {
    let messages = client.fetch_waiting_messages()?;
    if messages.is_empty() {
        println!("No waiting messages.");
    }
    let mut out = io::stdout().lock();
    for message in &messages {
        print_message(&mut out, message, &config.download_dir)?;
    }
    Ok(())
}

/// Prints one received message. A file that cannot be saved is reported
/// in place so the rest of the batch is still shown.
fn print_message(
    out: &mut impl Write,
    message: &ReceivedMessage,
    download_dir: &Path,
) -> io::Result<()> {
    let sender = match &message.sender_name {
        Some(name) => name.clone(),
        None => message.sender.to_string(),
    };

    writeln!(out, "From: {sender}")?;
    writeln!(out, "Content:")?;
    match &message.incoming {
        Incoming::KeyRequested => writeln!(out, "Request for symmetric key")?,
        Incoming::KeyEstablished => writeln!(out, "symmetric key received")?,
        Incoming::KeyRejected(e) => writeln!(out, "can't decrypt symmetric key ({e})")?,
        Incoming::Text(text) => writeln!(out, "{text}")?,
        Incoming::File(contents) => {
            let path = download_dir.join(format!("received_{}.bin", message.message_id));
            match fs::write(&path, contents) {
                Ok(()) => writeln!(out, "{}", path.display())?,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not save received file");
                    writeln!(out, "[Failed to save file: {e}]")?
                }
            }
        }
        Incoming::Undecryptable { .. } => writeln!(out, "can't decrypt message")?,
        Incoming::NoKey { .. } => writeln!(out, "can't decrypt message (no symmetric key)")?,
        Incoming::Unknown { content } => {
            writeln!(out, "unknown message type, {} bytes", content.len())?
        }
    }
    writeln!(out, "-----<EOM>-----")?;
    writeln!(out)
}

fn with_peer(
    client: &mut Client,
    input: &mut impl BufRead,
    action: impl FnOnce(&mut Client, ClientId) -> Result<(), Error>,
) -> Result<(), Error> {
    let name = prompt_required(input, "Enter username:", "username")?;
    let peer = client.find_peer(&name)?;
    action(client, peer.id)?;
    println!("Sent to {name}.");
    Ok(())
}

fn send_text(client: &mut Client, input: &mut impl BufRead) -> Result<(), Error> {
    let name = prompt_required(input, "Enter username:", "username")?;
    let peer = client.find_peer(&name)?;
    let text = prompt(input, "Enter message:")?.unwrap_or_default();

    client.send_text(peer.id, &text)?;
    println!("Message sent to {name}.");
    Ok(())
}

fn send_file(client: &mut Client, input: &mut impl BufRead) -> Result<(), Error> {
    let name = prompt_required(input, "Enter username:", "username")?;
    let peer = client.find_peer(&name)?;
    let path = PathBuf::from(prompt_required(input, "Enter file path:", "file path")?);
    let contents = fs::read(&path)
        .map_err(|e| Error::Config(format!("file not found: {}: {e}", path.display())))?;

    client.send_file(peer.id, &contents)?;
    println!("File sent to {name}.");
    Ok(())
}
