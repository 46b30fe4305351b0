//! Probabilistic primality testing and random prime generation.

use crate::error::CryptoError;
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::Rng;

/// Primes resolved by direct lookup. Candidates divisible by one of them are
/// rejected before any witness is drawn.
pub const SMALL_PRIMES: [u32; 9] = [2, 3, 5, 7, 11, 13, 17, 19, 23];

/// Witness trials per candidate. A composite survives with probability at
/// most 4^-8.
pub const MILLER_RABIN_TRIALS: usize = 8;

/// Miller-Rabin test with the thread-local RNG.
///
/// `false` means `n` is certainly composite; `true` means `n` is prime with
/// overwhelming probability. Results for a composite may differ between
/// calls since witnesses are random.
pub fn is_probably_prime(n: &BigUint) -> bool {
    is_probably_prime_with(n, MILLER_RABIN_TRIALS, &mut rand::thread_rng())
}

/// Miller-Rabin test with an explicit trial count and RNG.
pub fn is_probably_prime_with<R: Rng + ?Sized>(n: &BigUint, trials: usize, rng: &mut R) -> bool {
    for p in SMALL_PRIMES {
        let p = BigUint::from(p);
        if *n == p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }
    if *n < BigUint::from(SMALL_PRIMES[SMALL_PRIMES.len() - 1]) {
        // 0, 1 and nothing else below 23 survives the loop above.
        return false;
    }

    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let n_minus_one = n - &one;

    // n - 1 = 2^s * d with d odd
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for _ in 0..trials {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Draws a uniformly random prime from `[low, high]`.
///
/// Candidates are rejection-sampled, so the expected number of draws is
/// about `ln(high)`. There is no retry bound: a non-empty range that holds
/// no prime never returns.
pub fn random_prime(low: &BigUint, high: &BigUint) -> Result<BigUint, CryptoError> {
    random_prime_with(low, high, &mut rand::thread_rng())
}

/// [`random_prime`] with an explicit RNG.
pub fn random_prime_with<R: Rng + ?Sized>(
    low: &BigUint,
    high: &BigUint,
    rng: &mut R,
) -> Result<BigUint, CryptoError> {
    if low > high {
        return Err(CryptoError::EmptyRange);
    }
    let upper = high + 1u32;
    loop {
        let candidate = rng.gen_biguint_range(low, &upper);
        if is_probably_prime_with(&candidate, MILLER_RABIN_TRIALS, rng) {
            return Ok(candidate);
        }
    }
}

/// Inclusive range of integers whose binary length is exactly `bits`.
pub fn bit_range(bits: u64) -> (BigUint, BigUint) {
    let low = BigUint::one() << (bits - 1);
    let high = (BigUint::one() << bits) - 1u32;
    (low, high)
}
