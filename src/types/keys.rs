use crate::{Error, PUBLIC_KEY_SIZE, SYMMETRIC_KEY_SIZE};
use std::fmt;
use zeroize::Zeroize;

/// RSA public key in its fixed 160-byte wire form.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }
}

impl From<[u8; PUBLIC_KEY_SIZE]> for PublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let key: [u8; PUBLIC_KEY_SIZE] =
            bytes.try_into().map_err(|_| Error::InvalidPublicKey {
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self(key))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}..)", hex::encode(&self.0[..8]))
    }
}

/// Encoded RSA private key. Wiped on drop.
#[derive(Clone)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for PrivateKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// A freshly generated RSA key pair.
#[derive(Debug)]
pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

/// AES-128 key shared with exactly one peer. Wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl SymmetricKey {
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

impl From<[u8; SYMMETRIC_KEY_SIZE]> for SymmetricKey {
    fn from(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for SymmetricKey {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let key: [u8; SYMMETRIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            Error::Crypto(format!(
                "Invalid AES key size: expected {SYMMETRIC_KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_size_is_enforced() {
        assert!(PublicKey::try_from(&[1u8; PUBLIC_KEY_SIZE][..]).is_ok());
        assert!(matches!(
            PublicKey::try_from(&[1u8; 162][..]),
            Err(Error::InvalidPublicKey {
                expected: 160,
                actual: 162
            })
        ));
    }

    #[test]
    fn test_symmetric_key_size_is_enforced() {
        let key = SymmetricKey::try_from(&[9u8; 16][..]).unwrap();
        assert_eq!(key.as_bytes(), &[9u8; 16]);
        assert!(SymmetricKey::try_from(&[9u8; 15][..]).is_err());
        assert!(SymmetricKey::try_from(&[9u8; 32][..]).is_err());
    }

    #[test]
    fn test_secrets_are_not_printed() {
        let key = SymmetricKey::from([0xab; 16]);
        assert_eq!(format!("{key:?}"), "SymmetricKey(..)");

        let private_key = PrivateKey::from(vec![0xab; 32]);
        assert!(!format!("{private_key:?}").contains("ab"));
    }
}
