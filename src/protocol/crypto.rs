//! AES-128-CBC with PKCS#7 padding for the encrypted file protocol (§4.7).
//! Built on RustCrypto's `aes`/`cbc` crates, siblings of the `hmac`/`sha2`
//! stack already used for authentication elsewhere in this ecosystem.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;
use cbc::{Decryptor, Encryptor};
use rand::RngCore;

/// Number of bytes in an AES-128 key and in a CBC initialization vector.
pub const KEY_LEN: usize = 16;
pub const IV_LEN: usize = 16;

/// Fills a fresh, random IV using the system CSPRNG.
#[must_use]
pub fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

/// Encrypts `plaintext` under `key`/`iv`, PKCS#7-padding it to a block
/// boundary first.
#[must_use]
pub fn encrypt(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    Encryptor::<Aes128>::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypts and un-pads `ciphertext`, which must be a whole number of
/// blocks produced by [`encrypt`] under the same `key`/`iv`.
pub fn decrypt(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Option<Vec<u8>> {
    Decryptor::<Aes128>::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .ok()
}

/// Encrypts a file's body across many writes with a single IV/key: full
/// blocks are emitted as they complete, the tail is PKCS#7-padded only once
/// `finish` is called at protocol close. This matches the wire expectation
/// of one continuous CBC stream per file rather than independently padded
/// per-write ciphertexts, which would break decoding at arbitrary write
/// boundaries.
pub struct StreamEncryptor {
    cipher: Encryptor<Aes128>,
    pending: Vec<u8>,
}

impl StreamEncryptor {
    #[must_use]
    pub fn new(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Self {
        Self {
            cipher: Encryptor::<Aes128>::new(key.into(), iv.into()),
            pending: Vec::new(),
        }
    }

    /// Feeds `data` in, returning newly-completed ciphertext blocks. Bytes
    /// that don't fill a full 16-byte block are buffered for the next call.
    pub fn update(&mut self, data: &[u8]) -> Vec<u8> {
        self.pending.extend_from_slice(data);
        let mut out = Vec::with_capacity(self.pending.len());
        let whole_blocks = self.pending.len() / IV_LEN;
        for chunk in self.pending[..whole_blocks * IV_LEN].chunks_exact(IV_LEN) {
            let mut block = GenericArray::clone_from_slice(chunk);
            self.cipher.encrypt_block_mut(&mut block);
            out.extend_from_slice(&block);
        }
        self.pending.drain(..whole_blocks * IV_LEN);
        out
    }

    /// Pads whatever is left in the buffer (always < one block) and
    /// encrypts it, consuming the encryptor.
    pub fn finish(mut self) -> Vec<u8> {
        let pending = std::mem::take(&mut self.pending);
        self.cipher.encrypt_padded_vec_mut::<Pkcs7>(&pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let key = [7u8; KEY_LEN];
        let iv = random_iv();
        let plaintext = b"the quick brown fox jumps";
        let ciphertext = encrypt(&key, &iv, plaintext);
        assert_ne!(ciphertext, plaintext);
        assert_eq!(decrypt(&key, &iv, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn stream_encryptor_matches_one_shot_for_split_writes() {
        let key = [3u8; KEY_LEN];
        let iv = [9u8; IV_LEN];
        let plaintext = b"twenty-six byte message!!";

        let one_shot = encrypt(&key, &iv, plaintext);

        let mut stream = StreamEncryptor::new(&key, &iv);
        let mut streamed = stream.update(&plaintext[..10]);
        streamed.extend(stream.update(&plaintext[10..]));
        streamed.extend(stream.finish());

        assert_eq!(streamed, one_shot);
    }

    #[test]
    fn pads_to_block_boundary() {
        let key = [0u8; KEY_LEN];
        let iv = [0u8; IV_LEN];
        let ciphertext = encrypt(&key, &iv, b"");
        assert_eq!(ciphertext.len(), 16);
    }
}
