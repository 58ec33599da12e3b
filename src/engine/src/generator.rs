//! Random login names and passwords for generated accounts

use rand::seq::SliceRandom;
use rand::Rng;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Prefix of generated account login names
pub const LOGIN_NAME_PREFIX: &str = "vault-role";

/// Prefix of generated worker names
pub const WORKER_NAME_PREFIX: &str = "vault-worker";

/// Character policy for a generated string. Characters never repeat.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub length: usize,
    pub digits: usize,
    pub lowercase_only: bool,
}

/// 8 lowercase letters
pub const SUFFIX_POLICY: Policy = Policy {
    length: 8,
    digits: 0,
    lowercase_only: true,
};

/// 16 characters: all ten digits plus six mixed-case letters
pub const PASSWORD_POLICY: Policy = Policy {
    length: 16,
    digits: 10,
    lowercase_only: false,
};

/// Generate a string satisfying `policy`
pub fn generate<R: Rng + ?Sized>(rng: &mut R, policy: Policy) -> String {
    debug_assert!(policy.digits <= DIGITS.len());

    let letters: Vec<u8> = if policy.lowercase_only {
        LOWER.to_vec()
    } else {
        LOWER.iter().chain(UPPER.iter()).copied().collect()
    };

    let mut chars: Vec<u8> = DIGITS
        .choose_multiple(rng, policy.digits)
        .copied()
        .chain(
            letters
                .choose_multiple(rng, policy.length - policy.digits)
                .copied(),
        )
        .collect();
    chars.shuffle(rng);

    chars.into_iter().map(char::from).collect()
}

/// `vault-role-<role>-<suffix>`
pub fn login_name(role: &str) -> String {
    format!(
        "{}-{}-{}",
        LOGIN_NAME_PREFIX,
        role,
        generate(&mut rand::thread_rng(), SUFFIX_POLICY)
    )
}

/// `vault-worker-<role>-<suffix>`
pub fn worker_name(role: &str) -> String {
    format!(
        "{}-{}-{}",
        WORKER_NAME_PREFIX,
        role,
        generate(&mut rand::thread_rng(), SUFFIX_POLICY)
    )
}

pub fn password() -> String {
    generate(&mut rand::thread_rng(), PASSWORD_POLICY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_login_name_shape() {
        let name = login_name("r1");
        let suffix = name.strip_prefix("vault-role-r1-").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_worker_name_shape() {
        let name = worker_name("edge");
        assert!(name.starts_with("vault-worker-edge-"));
        assert_eq!(name.len(), "vault-worker-edge-".len() + 8);
    }

    proptest! {
        #[test]
        fn prop_password_policy(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let pw = generate(&mut rng, PASSWORD_POLICY);

            prop_assert_eq!(pw.len(), 16);
            prop_assert_eq!(pw.chars().filter(|c| c.is_ascii_digit()).count(), 10);
            prop_assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));

            let distinct: HashSet<char> = pw.chars().collect();
            prop_assert_eq!(distinct.len(), 16);
        }

        #[test]
        fn prop_suffix_policy(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let suffix = generate(&mut rng, SUFFIX_POLICY);

            prop_assert_eq!(suffix.len(), 8);
            prop_assert!(suffix.chars().all(|c| c.is_ascii_lowercase()));
        }
    }
}
