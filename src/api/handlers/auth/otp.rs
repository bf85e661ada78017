//! One-time verification code generation.

use rand::Rng;

/// Source of 6-digit verification codes, injectable for tests.
pub trait CodeGenerator: Send + Sync {
    /// Return a zero-padded code in `000000..=999999`.
    fn six_digit_code(&self) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn six_digit_code(&self) -> String {
        // Uniform over the full range; leading zeros are significant, the
        // stored code is compared as a string.
        format!("{:06}", rand::thread_rng().gen_range(0..=999_999))
    }
}

#[cfg(test)]
pub(crate) struct FixedCodeGenerator(pub &'static str);

#[cfg(test)]
impl CodeGenerator for FixedCodeGenerator {
    fn six_digit_code(&self) -> String {
        self.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{CodeGenerator, RandomCodeGenerator};

    #[test]
    fn codes_are_six_zero_padded_digits() {
        for _ in 0..256 {
            let code = RandomCodeGenerator.six_digit_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()), "code: {code}");
        }
    }

    #[test]
    fn codes_vary() {
        let first = RandomCodeGenerator.six_digit_code();
        let distinct = (0..64).any(|_| RandomCodeGenerator.six_digit_code() != first);
        assert!(distinct, "64 consecutive identical codes");
    }
}
