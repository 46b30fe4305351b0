//! RSA keypairs, textbook encryption and hash-then-sign signatures.

use crate::error::CryptoError;
use crate::prime::{bit_range, random_prime_with};
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Conventional public exponent tried first.
pub const DEFAULT_PUBLIC_EXPONENT: u32 = 65537;

/// Smallest accepted prime size.
pub const MIN_PRIME_BITS: u64 = 16;

/// Public half of a keypair: `(e, n)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    e: BigUint,
    n: BigUint,
}

/// Private half of a keypair: `(d, n)`.
#[derive(Clone)]
struct PrivateKey {
    d: BigUint,
    n: BigUint,
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("n_bits", &self.n.bits())
            .finish_non_exhaustive()
    }
}

/// A generated identity. Immutable once built.
#[derive(Debug, Clone)]
pub struct Keypair {
    public: PublicKey,
    private: PrivateKey,
}

/// Ciphertext for a recipient plus the sender's signature over the plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    pub ciphertext: BigUint,
    pub signature: BigUint,
}

impl PublicKey {
    /// Builds a public key from raw parts.
    pub fn from_parts(e: BigUint, n: BigUint) -> Result<Self, CryptoError> {
        if n <= BigUint::one() || e <= BigUint::one() {
            return Err(CryptoError::Malformed("exponent and modulus must exceed 1".into()));
        }
        Ok(Self { e, n })
    }

    pub fn exponent(&self) -> &BigUint {
        &self.e
    }

    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// Encrypts `message` read as a big-endian unsigned integer.
    ///
    /// Textbook RSA: deterministic and unpadded. Leading zero bytes of the
    /// message do not survive decryption.
    pub fn encrypt(&self, message: &[u8]) -> Result<BigUint, CryptoError> {
        let m = BigUint::from_bytes_be(message);
        if m >= self.n {
            return Err(CryptoError::MessageTooLarge);
        }
        Ok(m.modpow(&self.e, &self.n))
    }

    /// Checks a signature produced by [`Keypair::sign`].
    pub fn verify(&self, message: &[u8], signature: &BigUint) -> bool {
        if *signature >= self.n {
            return false;
        }
        signature.modpow(&self.e, &self.n) == digest(message, &self.n)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.e, self.n)
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    /// Parses the `<e> <n>` decimal form written by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (e, n) = parse_pair(s)?;
        Self::from_parts(e, n)
    }
}

impl Keypair {
    /// Generates a keypair from two distinct `bits`-long primes.
    pub fn generate(bits: u64) -> Result<Self, CryptoError> {
        Self::generate_with(bits, &mut rand::thread_rng())
    }

    /// [`Keypair::generate`] with an explicit RNG.
    pub fn generate_with<R: Rng + ?Sized>(bits: u64, rng: &mut R) -> Result<Self, CryptoError> {
        if bits < MIN_PRIME_BITS {
            return Err(CryptoError::KeySize {
                bits,
                min: MIN_PRIME_BITS,
            });
        }

        let (low, high) = bit_range(bits);
        let (p, q) = loop {
            let p = random_prime_with(&low, &high, rng)?;
            let q = random_prime_with(&low, &high, rng)?;
            if p != q {
                break (p, q);
            }
        };

        let n = &p * &q;
        let phi = (&p - 1u32) * (&q - 1u32);

        let base = BigUint::from(DEFAULT_PUBLIC_EXPONENT);
        let ceiling = &base * 2u32;
        let mut e = base.clone();
        while !e.gcd(&phi).is_one() {
            e = random_prime_with(&base, &ceiling, rng)?;
        }

        let d = mod_inverse(&e, &phi)
            .ok_or_else(|| CryptoError::Malformed("exponent has no inverse".into()))?;

        Ok(Self {
            public: PublicKey { e, n: n.clone() },
            private: PrivateKey { d, n },
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Decrypts a ciphertext produced by [`PublicKey::encrypt`].
    pub fn decrypt(&self, ciphertext: &BigUint) -> Result<Vec<u8>, CryptoError> {
        if *ciphertext >= self.private.n {
            return Err(CryptoError::Rejected);
        }
        let m = ciphertext.modpow(&self.private.d, &self.private.n);
        Ok(to_bytes(&m))
    }

    /// Signs the SHA-256 digest of `message`, reduced modulo `n`.
    pub fn sign(&self, message: &[u8]) -> BigUint {
        digest(message, &self.private.n).modpow(&self.private.d, &self.private.n)
    }

    /// Encrypts `message` for `recipient` and signs it with this identity.
    pub fn seal(&self, recipient: &PublicKey, message: &[u8]) -> Result<SealedMessage, CryptoError> {
        Ok(SealedMessage {
            ciphertext: recipient.encrypt(message)?,
            signature: self.sign(message),
        })
    }

    /// Decrypts a sealed message and checks it was signed by `sender`.
    ///
    /// Any failure comes back as [`CryptoError::Rejected`].
    pub fn open(&self, sender: &PublicKey, sealed: &SealedMessage) -> Result<Vec<u8>, CryptoError> {
        let plaintext = self
            .decrypt(&sealed.ciphertext)
            .map_err(|_| CryptoError::Rejected)?;
        if !sender.verify(&plaintext, &sealed.signature) {
            return Err(CryptoError::Rejected);
        }
        Ok(plaintext)
    }
}

impl fmt::Display for SealedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ciphertext, self.signature)
    }
}

impl FromStr for SealedMessage {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ciphertext, signature) = parse_pair(s)?;
        Ok(Self {
            ciphertext,
            signature,
        })
    }
}

fn digest(message: &[u8], n: &BigUint) -> BigUint {
    let hash = Sha256::digest(message);
    BigUint::from_bytes_be(&hash) % n
}

fn to_bytes(m: &BigUint) -> Vec<u8> {
    if m.is_zero() {
        Vec::new()
    } else {
        m.to_bytes_be()
    }
}

fn parse_pair(s: &str) -> Result<(BigUint, BigUint), CryptoError> {
    let mut parts = s.split_whitespace();
    let (Some(a), Some(b), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CryptoError::Malformed("expected two decimal integers".into()));
    };
    let parse = |v: &str| {
        v.parse::<BigUint>()
            .map_err(|e| CryptoError::Malformed(e.to_string()))
    };
    Ok((parse(a)?, parse(b)?))
}

/// Inverse of `a` modulo `m` by the extended Euclidean algorithm.
fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let modulus = BigInt::from(m.clone());
    let (mut old_r, mut r) = (BigInt::from(a.clone()), modulus.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());

    while !r.is_zero() {
        let q = &old_r / &r;
        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &q * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    if !old_r.is_one() {
        return None;
    }
    old_s.mod_floor(&modulus).to_biguint()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prime::is_probably_prime;

    const TEST_BITS: u64 = 128;

    fn flip_bit(value: &BigUint, bit: u64) -> BigUint {
        value ^ (BigUint::one() << bit)
    }

    #[test]
    fn test_mod_inverse() {
        let inv = mod_inverse(&BigUint::from(3u32), &BigUint::from(11u32)).unwrap();
        assert_eq!(inv, BigUint::from(4u32));
        assert!(mod_inverse(&BigUint::from(6u32), &BigUint::from(9u32)).is_none());
    }

    #[test]
    fn test_keypair_invariants() {
        let keypair = Keypair::generate(TEST_BITS).unwrap();
        let public = keypair.public_key();

        // Modulus is the product of two TEST_BITS-long primes.
        let bits = public.modulus().bits();
        assert!(bits == 2 * TEST_BITS || bits == 2 * TEST_BITS - 1);
        assert!(!is_probably_prime(public.modulus()));

        // d undoes e on a raw value.
        let x = BigUint::from(123_456_789u64);
        let y = x.modpow(public.exponent(), public.modulus());
        assert_eq!(y.modpow(&keypair.private.d, &keypair.private.n), x);
    }

    #[test]
    fn test_key_size_too_small() {
        assert_eq!(
            Keypair::generate(8).unwrap_err(),
            CryptoError::KeySize { bits: 8, min: 16 }
        );
    }

    #[test]
    fn test_small_keys_still_work() {
        let keypair = Keypair::generate(MIN_PRIME_BITS).unwrap();
        let ciphertext = keypair.public_key().encrypt(b"hi").unwrap();
        assert_eq!(keypair.decrypt(&ciphertext).unwrap(), b"hi");
        let signature = keypair.sign(b"hi");
        assert!(keypair.public_key().verify(b"hi", &signature));
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let keypair = Keypair::generate(TEST_BITS).unwrap();
        for message in [&b"a"[..], b"BID 1 150", b"The quick brown fox jumps"] {
            let ciphertext = keypair.public_key().encrypt(message).unwrap();
            assert_eq!(keypair.decrypt(&ciphertext).unwrap(), message);
        }
    }

    #[test]
    fn test_message_too_large() {
        let keypair = Keypair::generate(TEST_BITS).unwrap();
        let message = vec![0xffu8; (2 * TEST_BITS / 8) as usize + 1];
        assert_eq!(
            keypair.public_key().encrypt(&message),
            Err(CryptoError::MessageTooLarge)
        );
    }

    #[test]
    fn test_sign_verify() {
        let keypair = Keypair::generate(TEST_BITS).unwrap();
        let message = b"HELLO alice";
        let signature = keypair.sign(message);

        assert!(keypair.public_key().verify(message, &signature));
        for (index, mask) in [(0usize, 0x01u8), (5, 0x80), (message.len() - 1, 0x01)] {
            let mut tampered = message.to_vec();
            tampered[index] ^= mask;
            assert_eq!((tampered[index] ^ message[index]).count_ones(), 1);
            assert!(!keypair.public_key().verify(&tampered, &signature));
        }
        for bit in [0u64, 7, 64, 200] {
            assert!(!keypair
                .public_key()
                .verify(message, &flip_bit(&signature, bit)));
        }
    }

    #[test]
    fn test_verify_rejects_other_signer() {
        let alice = Keypair::generate(TEST_BITS).unwrap();
        let bob = Keypair::generate(TEST_BITS).unwrap();
        let signature = alice.sign(b"payload");
        assert!(!bob.public_key().verify(b"payload", &signature));
    }

    #[test]
    fn test_seal_and_open() {
        let alice = Keypair::generate(TEST_BITS).unwrap();
        let bob = Keypair::generate(TEST_BITS).unwrap();

        let sealed = alice.seal(bob.public_key(), b"SPEAK hi bob").unwrap();
        assert_eq!(
            bob.open(alice.public_key(), &sealed).unwrap(),
            b"SPEAK hi bob"
        );

        // Wrong sender key and tampered ciphertext both collapse to Rejected.
        assert_eq!(
            bob.open(bob.public_key(), &sealed),
            Err(CryptoError::Rejected)
        );
        let tampered = SealedMessage {
            ciphertext: flip_bit(&sealed.ciphertext, 3),
            signature: sealed.signature.clone(),
        };
        assert_eq!(
            bob.open(alice.public_key(), &tampered),
            Err(CryptoError::Rejected)
        );
    }

    #[test]
    fn test_public_key_text_form() {
        let keypair = Keypair::generate(TEST_BITS).unwrap();
        let text = keypair.public_key().to_string();
        let parsed: PublicKey = text.parse().unwrap();
        assert_eq!(&parsed, keypair.public_key());

        assert!("65537".parse::<PublicKey>().is_err());
        assert!("abc 123".parse::<PublicKey>().is_err());
        assert!("1 1".parse::<PublicKey>().is_err());
    }

    #[test]
    fn test_sealed_message_text_form() {
        let sealed: SealedMessage = "42 17".parse().unwrap();
        assert_eq!(sealed.ciphertext, BigUint::from(42u32));
        assert_eq!(sealed.signature, BigUint::from(17u32));
        assert_eq!(sealed.to_string(), "42 17");
    }
}
