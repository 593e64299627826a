//! Cryptographic primitives for the custody ledger.
//!
//! Wraps Ed25519 signing, SHA-256 integrity hashing and Blake3 content
//! addressing with strong types.

use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePublicKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CryptoError;

/// A 32-byte SHA-256 hash.
///
/// This is the integrity digest exposed to callers (`canonical_hash_hex`,
/// `inputs_snapshot_hash`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 hash of data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Convert to lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A 32-byte Blake3 hash.
///
/// Used to content-address ledger events.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blake3Hash(pub [u8; 32]);

impl Blake3Hash {
    /// Hash with a domain separation prefix.
    pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain);
        hasher.update(data);
        Self(*hasher.finalize().as_bytes())
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Blake3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blake3({})", &self.to_hex()[..16])
    }
}

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidPublicKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(arr))
    }

    /// Parse an SPKI PEM document (`-----BEGIN PUBLIC KEY-----`).
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = VerifyingKey::from_public_key_pem(pem.trim())
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(key.to_bytes()))
    }

    /// Parse either a PEM document or a 64-char hex key.
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        if s.trim_start().starts_with("-----BEGIN") {
            Self::from_pem(s)
        } else {
            Self::from_hex(s)
        }
    }

    /// Encode as an SPKI PEM document.
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        key.to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = Signature::from_bytes(&signature.0);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 128-char hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidSignature)?;
        let arr: [u8; 64] = bytes.try_into().map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &self.to_hex()[..16])
    }
}

/// Verify a hex signature over canonical bytes against a provider key.
///
/// Returns `false` for a malformed key, a malformed signature, or a signature
/// that does not verify. Verification failure is an expected outcome, so this
/// never errors. The caller decides which fields were stripped to produce
/// `message`.
pub fn verify_signature(public_key: &str, message: &[u8], signature_hex: &str) -> bool {
    let Ok(key) = Ed25519PublicKey::parse(public_key) else {
        return false;
    };
    let Ok(signature) = Ed25519Signature::from_hex(signature_hex) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}

/// A keypair for signing canonical records.
///
/// This wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Get the public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Get the public key as an SPKI PEM document.
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        self.public_key().to_pem()
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        let sig = self.signing_key.sign(message);
        Ed25519Signature(sig.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"hello world";
        let signature = keypair.sign(message);

        keypair
            .public_key()
            .verify(message, &signature)
            .expect("valid signature should verify");

        let tampered = b"hello worlD";
        assert!(keypair.public_key().verify(tampered, &signature).is_err());
    }

    #[test]
    fn test_keypair_deterministic_from_seed() {
        let seed = [0x42u8; 32];
        let kp1 = Keypair::from_seed(&seed);
        let kp2 = Keypair::from_seed(&seed);
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            Sha256Hash::hash(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_blake3_domain_separation() {
        let a = Blake3Hash::hash_with_domain(b"domain-a", b"data");
        let b = Blake3Hash::hash_with_domain(b"domain-b", b"data");
        assert_ne!(a, b);
        assert_eq!(a, Blake3Hash::hash_with_domain(b"domain-a", b"data"));
    }

    #[test]
    fn test_pem_roundtrip() {
        let keypair = Keypair::from_seed(&[0x07; 32]);
        let pem = keypair.public_key_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert_eq!(Ed25519PublicKey::from_pem(&pem).unwrap(), keypair.public_key());
        assert_eq!(Ed25519PublicKey::parse(&pem).unwrap(), keypair.public_key());
    }

    #[test]
    fn test_verify_signature_accepts_pem_and_hex() {
        let keypair = Keypair::from_seed(&[0x09; 32]);
        let message = b"canonical bytes";
        let sig = keypair.sign(message).to_hex();

        let pem = keypair.public_key_pem().unwrap();
        assert!(verify_signature(&pem, message, &sig));
        assert!(verify_signature(&keypair.public_key().to_hex(), message, &sig));
    }

    #[test]
    fn test_verify_signature_never_errors_on_garbage() {
        let keypair = Keypair::from_seed(&[0x09; 32]);
        let pem = keypair.public_key_pem().unwrap();

        assert!(!verify_signature(&pem, b"m", "not-hex"));
        assert!(!verify_signature(&pem, b"m", "abcd"));
        assert!(!verify_signature("-----BEGIN PUBLIC KEY-----\nMIIBIjAN\n-----END PUBLIC KEY-----", b"m", &"00".repeat(64)));
        assert!(!verify_signature("", b"m", &"00".repeat(64)));
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let keypair = Keypair::generate();
        let sig = keypair.sign(b"x");
        assert_eq!(Ed25519Signature::from_hex(&sig.to_hex()).unwrap(), sig);
    }
}
