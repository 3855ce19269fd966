use crate::{ClientId, CryptoProvider, Error, PrivateKey, PublicKey};
use std::fs;
use std::io;
use std::path::Path;

/// This client's registered identity.
#[derive(Clone, Debug)]
pub struct Identity {
    pub username: String,
    pub id: ClientId,
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

impl Identity {
    /// Reads an identity saved by [`Identity::save`].
    ///
    /// Returns `Ok(None)` when the file does not exist, which is the normal
    /// state before the first registration. File layout, one item per line:
    /// username, hex client id, Base64 private key.
    pub fn load(path: &Path, crypto: &impl CryptoProvider) -> Result<Option<Self>, Error> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Config(format!("{}: {e}", path.display()))),
        };

        let mut lines = contents.lines();
        let mut next_line = |what: &str| {
            lines
                .next()
                .filter(|line| !line.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{}: missing {what}", path.display())))
        };

        let username = next_line("username")?.to_string();
        let id = ClientId::from_hex(next_line("client id")?)?;
        let private_key = PrivateKey::from(crypto.base64_decode(next_line("private key")?)?);
        let public_key = crypto.derive_public_key(&private_key)?;

        Ok(Some(Self {
            username,
            id,
            private_key,
            public_key,
        }))
    }

    pub fn save(&self, path: &Path, crypto: &impl CryptoProvider) -> Result<(), Error> {
        let contents = format!(
            "{}\n{}\n{}\n",
            self.username,
            self.id.to_hex(),
            crypto.base64_encode(self.private_key.as_bytes())
        );

        fs::write(path, contents).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}
