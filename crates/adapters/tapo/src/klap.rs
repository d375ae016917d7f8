//! KLAP: the local authentication and transport encryption of Tapo plugs.
//!
//! ## Handshake
//!
//! 1. The client posts a random 16-byte *local seed* to `/app/handshake1`.
//!    The plug answers with its *remote seed* followed by
//!    `sha256(local ‖ remote ‖ auth_hash)`, proving it knows the account.
//! 2. The client posts `sha256(remote ‖ local ‖ auth_hash)` to
//!    `/app/handshake2`, proving the same.
//!
//! `auth_hash` is `sha256(sha1(username) ‖ sha1(password))`.
//!
//! ## Transport
//!
//! Both seeds and the auth hash derive an AES-128-CBC key, a 12-byte IV
//! prefix, a starting sequence number and a signing key. Every request bumps
//! the sequence, which forms the last 4 bytes of the IV, and is sent as
//! `signature(32) ‖ ciphertext`.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use sha1::Sha1;
use sha2::{Digest, Sha256};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

pub const SEED_LEN: usize = 16;
pub const HASH_LEN: usize = 32;

pub type Seed = [u8; SEED_LEN];
pub type Hash = [u8; HASH_LEN];

/// Errors opening an encrypted payload.
#[derive(Debug, thiserror::Error)]
pub enum KlapError {
    #[error("payload of {0} bytes is shorter than its signature")]
    Truncated(usize),

    #[error("invalid padding, wrong key or sequence")]
    Padding,
}

fn sha256(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Account fingerprint both sides derive from the cloud credentials.
#[must_use]
pub fn auth_hash(username: &str, password: &str) -> Hash {
    let user = Sha1::digest(username.as_bytes());
    let pass = Sha1::digest(password.as_bytes());
    sha256(&[user.as_slice(), pass.as_slice()])
}

/// Proof the plug returns in the first handshake.
#[must_use]
pub fn server_proof(local: &Seed, remote: &Seed, auth: &Hash) -> Hash {
    sha256(&[local.as_slice(), remote.as_slice(), auth.as_slice()])
}

/// Proof the client sends in the second handshake.
#[must_use]
pub fn client_proof(local: &Seed, remote: &Seed, auth: &Hash) -> Hash {
    sha256(&[remote.as_slice(), local.as_slice(), auth.as_slice()])
}

/// Session keys and the running sequence number.
#[derive(Clone)]
pub struct KlapCipher {
    key: [u8; 16],
    iv_prefix: [u8; 12],
    signature_key: [u8; 28],
    seq: i32,
}

impl KlapCipher {
    /// Derive the session keys from both seeds and the auth hash.
    #[must_use]
    pub fn new(local: &Seed, remote: &Seed, auth: &Hash) -> Self {
        let derive = |label: &[u8]| {
            sha256(&[label, local.as_slice(), remote.as_slice(), auth.as_slice()])
        };
        let key = derive(b"lsk");
        let iv = derive(b"iv");
        let signature = derive(b"ldk");

        let mut cipher = Self {
            key: [0; 16],
            iv_prefix: [0; 12],
            signature_key: [0; 28],
            seq: i32::from_be_bytes([iv[28], iv[29], iv[30], iv[31]]),
        };
        cipher.key.copy_from_slice(&key[..16]);
        cipher.iv_prefix.copy_from_slice(&iv[..12]);
        cipher.signature_key.copy_from_slice(&signature[..28]);
        cipher
    }

    /// Advance the sequence and encrypt `plaintext` under it.
    ///
    /// Returns the sequence number, which goes in the request query string,
    /// and the signed body.
    pub fn seal(&mut self, plaintext: &[u8]) -> (i32, Vec<u8>) {
        self.seq = self.seq.wrapping_add(1);
        (self.seq, self.encrypt(self.seq, plaintext))
    }

    /// Encrypt and sign `plaintext` under `seq` without touching the sequence.
    #[must_use]
    pub fn encrypt(&self, seq: i32, plaintext: &[u8]) -> Vec<u8> {
        let ciphertext = Aes128CbcEnc::new(&self.key.into(), &self.iv(seq).into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        let mut body = Vec::with_capacity(HASH_LEN + ciphertext.len());
        body.extend_from_slice(&self.signature(seq, &ciphertext));
        body.extend_from_slice(&ciphertext);
        body
    }

    /// Decrypt a `signature ‖ ciphertext` body produced under `seq`.
    ///
    /// The signature is skipped, not checked; plugs are inconsistent about it.
    ///
    /// # Errors
    ///
    /// Returns [`KlapError`] when the body is truncated or does not decrypt.
    pub fn open(&self, seq: i32, body: &[u8]) -> Result<Vec<u8>, KlapError> {
        let ciphertext = body
            .get(HASH_LEN..)
            .ok_or(KlapError::Truncated(body.len()))?;
        Aes128CbcDec::new(&self.key.into(), &self.iv(seq).into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| KlapError::Padding)
    }

    /// Whether `body` carries a valid signature for `seq`.
    #[must_use]
    pub fn verify(&self, seq: i32, body: &[u8]) -> bool {
        body.len() >= HASH_LEN && body[..HASH_LEN] == self.signature(seq, &body[HASH_LEN..])
    }

    fn iv(&self, seq: i32) -> [u8; 16] {
        let mut iv = [0; 16];
        iv[..12].copy_from_slice(&self.iv_prefix);
        iv[12..].copy_from_slice(&seq.to_be_bytes());
        iv
    }

    fn signature(&self, seq: i32, ciphertext: &[u8]) -> Hash {
        sha256(&[
            self.signature_key.as_slice(),
            seq.to_be_bytes().as_slice(),
            ciphertext,
        ])
    }
}
