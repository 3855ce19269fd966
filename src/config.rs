use crate::Error;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 1357;

/// Where the client finds the relay and keeps its local state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// `host:port` of the relay.
    pub server: String,
    pub server_info_path: PathBuf,
    pub my_info_path: PathBuf,
    /// Directory received files are written to.
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: format!("{DEFAULT_HOST}:{DEFAULT_PORT}"),
            server_info_path: PathBuf::from("server.info"),
            my_info_path: PathBuf::from("my.info"),
            download_dir: std::env::temp_dir(),
        }
    }
}

impl ClientConfig {
    /// Replaces `server` with the endpoint stored in `server_info_path`.
    pub fn load_server_info(&mut self) -> Result<(), Error> {
        self.server = read_server_info(&self.server_info_path)?;
        Ok(())
    }
}

/// Parses the first line of a `server.info` file.
///
/// Accepts `host:port`, or a bare port meaning the local host.
pub fn parse_server_info(line: &str) -> Result<String, Error> {
    let line = line.trim();
    let (host, port) = match line.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => (host, port),
        Some(_) => return Err(Error::Config(format!("Missing host in {line:?}"))),
        None => (DEFAULT_HOST, line),
    };

    let port: u16 = port
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid port in {line:?}: {e}")))?;

    Ok(format!("{}:{port}", host.trim()))
}

pub fn read_server_info(path: &Path) -> Result<String, Error> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Could not open {}: {e}", path.display())))?;
    let line = contents
        .lines()
        .next()
        .ok_or_else(|| Error::Config(format!("{} is empty", path.display())))?;

    parse_server_info(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server, "127.0.0.1:1357");
        assert_eq!(config.my_info_path, PathBuf::from("my.info"));
    }

    #[test]
    fn test_parse_server_info() {
        assert_eq!(parse_server_info("10.0.0.5:1234").unwrap(), "10.0.0.5:1234");
        assert_eq!(parse_server_info(" 4321 \n").unwrap(), "127.0.0.1:4321");
        assert_eq!(parse_server_info("relay.local:80").unwrap(), "relay.local:80");

        assert!(parse_server_info("localhost:port").is_err());
        assert!(parse_server_info(":1234").is_err());
        assert!(parse_server_info("70000").is_err());
    }

    #[test]
    fn test_load_server_info() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server.info");
        fs::write(&path, "192.168.1.7:9999\nignored\n").unwrap();

        let mut config = ClientConfig {
            server_info_path: path,
            ..ClientConfig::default()
        };
        config.load_server_info().unwrap();
        assert_eq!(config.server, "192.168.1.7:9999");
    }

    #[test]
    fn test_missing_server_info() {
        let dir = tempdir().unwrap();
        let mut config = ClientConfig {
            server_info_path: dir.path().join("server.info"),
            ..ClientConfig::default()
        };
        assert!(matches!(config.load_server_info(), Err(Error::Config(_))));
        assert_eq!(config.server, "127.0.0.1:1357");
    }
}
