//! Six-digit OTP code generation.

use rand::{rngs::OsRng, RngCore};
use tracing::error;

/// Code handed out when the OS entropy source fails.
///
/// This keeps OTP requests working but makes every code predictable, so it
/// is logged at `error` each time it happens.
pub const FALLBACK_CODE: &str = "123456";

const CODE_SPACE: u32 = 1_000_000;

// Largest multiple of CODE_SPACE that fits in a u32; draws at or above it are
// rejected so every code is equally likely.
const REJECTION_BOUND: u32 = (u32::MAX / CODE_SPACE) * CODE_SPACE;

pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        code_from(&mut OsRng)
    }
}

fn code_from<R: RngCore + ?Sized>(rng: &mut R) -> String {
    loop {
        let mut bytes = [0u8; 4];
        if let Err(err) = rng.try_fill_bytes(&mut bytes) {
            error!("Error generating OTP, using fallback code: {err}");
            return FALLBACK_CODE.to_string();
        }

        let value = u32::from_le_bytes(bytes);
        if value < REJECTION_BOUND {
            return format!("{:06}", value % CODE_SPACE);
        }
    }
}

#[cfg(test)]
pub use fixed::FixedCodeGenerator;

#[cfg(test)]
mod fixed {
    use super::CodeGenerator;

    /// Always returns the same code.
    #[derive(Clone, Debug)]
    pub struct FixedCodeGenerator(pub String);

    impl CodeGenerator for FixedCodeGenerator {
        fn generate(&self) -> String {
            self.0.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    struct BrokenEntropy;

    impl RngCore for BrokenEntropy {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy source unavailable"))
        }
    }

    struct Sequence(Vec<u32>);

    impl RngCore for Sequence {
        fn next_u32(&mut self) -> u32 {
            self.0.remove(0)
        }

        fn next_u64(&mut self) -> u64 {
            u64::from(self.next_u32())
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            let value = self.next_u32().to_le_bytes();
            dest.copy_from_slice(&value[..dest.len()]);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn is_six_digits(code: &str) -> bool {
        code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
    }

    #[test]
    fn random_codes_are_six_digits() {
        let generator = RandomCodeGenerator;
        for _ in 0..200 {
            let code = generator.generate();
            assert!(is_six_digits(&code), "unexpected code {code}");
        }
    }

    #[test]
    fn small_values_are_zero_padded() {
        let mut rng = Sequence(vec![42]);
        assert_eq!(code_from(&mut rng), "000042");
    }

    #[test]
    fn draws_above_bound_are_rejected() {
        let mut rng = Sequence(vec![u32::MAX, REJECTION_BOUND, 1_000_007]);
        assert_eq!(code_from(&mut rng), "000007");
    }

    #[test]
    fn seeded_rng_gives_six_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(is_six_digits(&code_from(&mut rng)));
    }

    #[test]
    fn broken_entropy_degrades_to_predictable_fallback() {
        // Known weakening: without entropy every caller gets the same code.
        let mut rng = BrokenEntropy;
        assert_eq!(code_from(&mut rng), FALLBACK_CODE);
        assert_eq!(code_from(&mut rng), FALLBACK_CODE);
    }

    #[test]
    fn fixed_generator_repeats_its_code() {
        let generator = FixedCodeGenerator("424242".to_string());
        assert_eq!(generator.generate(), "424242");
        assert_eq!(generator.generate(), "424242");
    }
}
