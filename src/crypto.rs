use crate::{Error, KeyPair, PUBLIC_KEY_SIZE, PrivateKey, PublicKey, SYMMETRIC_KEY_SIZE, SymmetricKey};
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

const RSA_KEY_BITS: usize = 1024;
// With e = 17 a 1024-bit key encodes to exactly 160 bytes of SubjectPublicKeyInfo.
const RSA_PUBLIC_EXPONENT: u64 = 17;

/// Peers and the relay expect CBC with an all-zero IV. Changing it breaks
/// interoperability with every existing client.
const ZERO_IV: [u8; 16] = [0u8; 16];

/// Cryptographic capabilities the protocol engine relies on.
pub trait CryptoProvider {
    fn generate_keypair(&self) -> Result<KeyPair, Error>;

    /// Recomputes the wire-form public key of a stored private key.
    fn derive_public_key(&self, private_key: &PrivateKey) -> Result<PublicKey, Error>;

    fn generate_symmetric_key(&self) -> Result<SymmetricKey, Error>;

    fn rsa_encrypt(&self, public_key: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, Error>;

    fn rsa_decrypt(&self, private_key: &PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, Error>;

    fn aes_encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> Vec<u8>;

    fn aes_decrypt(&self, key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>, Error>;

    fn base64_encode(&self, bytes: &[u8]) -> String;

    fn base64_decode(&self, encoded: &str) -> Result<Vec<u8>, Error>;
}

/// `CryptoProvider` backed by the RustCrypto crates.
///
/// - RSA-1024, public exponent 17, OAEP with SHA-1
/// - AES-128-CBC, PKCS#7 padding, zero IV
/// - standard Base64 with padding
#[derive(Clone, Copy, Debug, Default)]
pub struct RustCryptoProvider;

impl RustCryptoProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Total length of the DER structure at the start of `bytes`, so zero padding
/// after a short encoding can be ignored.
fn der_encoded_len(bytes: &[u8]) -> Option<usize> {
    if *bytes.first()? != 0x30 {
        return None;
    }

    let first = *bytes.get(1)?;
    if first < 0x80 {
        return Some(2 + usize::from(first));
    }

    let count = usize::from(first & 0x7f);
    if count == 0 || count > 2 {
        return None;
    }
    let len = bytes
        .get(2..2 + count)?
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));

    Some(2 + count + len)
}

fn encode_public_key(public_key: &RsaPublicKey) -> Result<PublicKey, Error> {
    let der = public_key
        .to_public_key_der()
        .map_err(|e| Error::Crypto(e.to_string()))?;
    let der = der.as_bytes();

    if der.len() > PUBLIC_KEY_SIZE {
        return Err(Error::InvalidPublicKey {
            expected: PUBLIC_KEY_SIZE,
            actual: der.len(),
        });
    }

    let mut bytes = [0u8; PUBLIC_KEY_SIZE];
    bytes[..der.len()].copy_from_slice(der);
    Ok(PublicKey::from(bytes))
}

fn decode_public_key(public_key: &PublicKey) -> Result<RsaPublicKey, Error> {
    let bytes = public_key.as_bytes();
    let len = der_encoded_len(bytes)
        .filter(|&len| len <= bytes.len())
        .ok_or_else(|| Error::Crypto("Public key is not a DER structure".to_string()))?;

    RsaPublicKey::from_public_key_der(&bytes[..len]).map_err(|e| Error::Crypto(e.to_string()))
}

fn decode_private_key(private_key: &PrivateKey) -> Result<RsaPrivateKey, Error> {
    RsaPrivateKey::from_pkcs8_der(private_key.as_bytes())
        .map_err(|e| Error::Crypto(format!("RSA key loading failed: {e}")))
}

impl CryptoProvider for RustCryptoProvider {
    fn generate_keypair(&self) -> Result<KeyPair, Error> {
        let exponent = BigUint::from(RSA_PUBLIC_EXPONENT);
        let private = RsaPrivateKey::new_with_exp(&mut rand_core::OsRng, RSA_KEY_BITS, &exponent)?;

        let public_key = encode_public_key(&RsaPublicKey::from(&private))?;
        let private_der = private
            .to_pkcs8_der()
            .map_err(|e| Error::Crypto(e.to_string()))?;

        Ok(KeyPair {
            private_key: PrivateKey::from(private_der.as_bytes().to_vec()),
            public_key,
        })
    }

    fn derive_public_key(&self, private_key: &PrivateKey) -> Result<PublicKey, Error> {
        let private = decode_private_key(private_key)?;
        encode_public_key(&RsaPublicKey::from(&private))
    }

    fn generate_symmetric_key(&self) -> Result<SymmetricKey, Error> {
        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        OsRng.try_fill_bytes(&mut key).map_err(|_| Error::Random)?;
        Ok(SymmetricKey::from(key))
    }

    fn rsa_encrypt(&self, public_key: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let public = decode_public_key(public_key)?;
        Ok(public.encrypt(&mut rand_core::OsRng, Oaep::new::<Sha1>(), plaintext)?)
    }

    fn rsa_decrypt(&self, private_key: &PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        let private = decode_private_key(private_key)?;
        private
            .decrypt(Oaep::new::<Sha1>(), ciphertext)
            .map_err(|e| Error::Decryption(format!("RSA decryption failed: {e}")))
    }

    fn aes_encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> Vec<u8> {
        Aes128CbcEnc::new(key.as_bytes().into(), &ZERO_IV.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    fn aes_decrypt(&self, key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        Aes128CbcDec::new(key.as_bytes().into(), &ZERO_IV.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| Error::Decryption("AES decryption failed".to_string()))
    }

    fn base64_encode(&self, bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn base64_decode(&self, encoded: &str) -> Result<Vec<u8>, Error> {
        base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::Config(format!("Invalid Base64: {e}")))
    }
}
