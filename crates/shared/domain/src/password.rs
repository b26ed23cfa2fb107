//! Password policy, strength scoring and hashing.
//!
//! The policy check short-circuits: callers get the first rule that failed,
//! which is what the registration form renders next to the field.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use serde::{Deserialize, Serialize};

use crate::constants::{
    COMMON_PASSWORDS, COMMON_PASSWORD_FRAGMENTS, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
    SPECIAL_CHARACTERS, VERY_WEAK_PASSWORD_LENGTH,
};
use crate::error::{DomainError, DomainResult};

// =============================================================================
// Policy
// =============================================================================

/// Password complexity requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self::standard()
    }
}

impl PasswordRequirements {
    /// Default policy: 8-255 characters, all four character classes.
    pub const fn standard() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            max_length: MAX_PASSWORD_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }

    /// Build a policy with custom length bounds and every class required.
    ///
    /// # Errors
    /// Returns a validation error if `min_length > max_length`.
    pub fn new(min_length: usize, max_length: usize) -> DomainResult<Self> {
        if min_length > max_length {
            return Err(DomainError::validation(format!(
                "minimum password length ({}) exceeds maximum ({})",
                min_length, max_length
            )));
        }

        Ok(Self {
            min_length,
            max_length,
            ..Self::standard()
        })
    }

    pub fn with_uppercase(mut self, required: bool) -> Self {
        self.require_uppercase = required;
        self
    }

    pub fn with_lowercase(mut self, required: bool) -> Self {
        self.require_lowercase = required;
        self
    }

    pub fn with_digit(mut self, required: bool) -> Self {
        self.require_digit = required;
        self
    }

    pub fn with_special(mut self, required: bool) -> Self {
        self.require_special = required;
        self
    }

    /// Check a password against this policy.
    ///
    /// Rules run in a fixed order and the first failure is returned:
    /// presence, minimum length, maximum length, uppercase, lowercase,
    /// digit, special character.
    pub fn validate(&self, password: &str) -> DomainResult<()> {
        if password.is_empty() {
            return Err(DomainError::password("password is required"));
        }

        let length = password.chars().count();
        if length < self.min_length {
            return Err(DomainError::password(format!(
                "password must be at least {} characters long",
                self.min_length
            )));
        }
        if length > self.max_length {
            return Err(DomainError::password(format!(
                "password must be at most {} characters long",
                self.max_length
            )));
        }

        let classes = CharacterClasses::of(password);
        if self.require_uppercase && !classes.upper {
            return Err(DomainError::password(
                "password must contain at least one uppercase letter",
            ));
        }
        if self.require_lowercase && !classes.lower {
            return Err(DomainError::password(
                "password must contain at least one lowercase letter",
            ));
        }
        if self.require_digit && !classes.digit {
            return Err(DomainError::password(
                "password must contain at least one digit",
            ));
        }
        if self.require_special && !classes.special {
            return Err(DomainError::password(
                "password must contain at least one special character",
            ));
        }

        Ok(())
    }
}

/// Validate a password against the given requirements.
pub fn validate_password(password: &str, requirements: &PasswordRequirements) -> DomainResult<()> {
    requirements.validate(password)
}

/// Character classes present in a password.
#[derive(Debug, Default, Clone, Copy)]
struct CharacterClasses {
    upper: bool,
    lower: bool,
    digit: bool,
    special: bool,
}

impl CharacterClasses {
    fn of(password: &str) -> Self {
        password.chars().fold(Self::default(), |mut classes, c| {
            classes.upper |= c.is_uppercase();
            classes.lower |= c.is_lowercase();
            classes.digit |= c.is_ascii_digit();
            classes.special |= SPECIAL_CHARACTERS.contains(c);
            classes
        })
    }

    fn count(&self) -> i32 {
        [self.upper, self.lower, self.digit, self.special]
            .iter()
            .filter(|present| **present)
            .count() as i32
    }
}

// =============================================================================
// Strength
// =============================================================================

/// Qualitative password strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordStrength {
    VeryWeak,
    Weak,
    Medium,
    Strong,
    VeryStrong,
}

impl std::fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PasswordStrength::VeryWeak => "very weak",
            PasswordStrength::Weak => "weak",
            PasswordStrength::Medium => "medium",
            PasswordStrength::Strong => "strong",
            PasswordStrength::VeryStrong => "very strong",
        };
        f.write_str(label)
    }
}

/// Score a password.
///
/// One point each for reaching 8 and 12 characters, one per character class,
/// minus two when it contains a well-known password fragment.
pub fn password_strength(password: &str) -> PasswordStrength {
    let length = password.chars().count();
    if length < VERY_WEAK_PASSWORD_LENGTH {
        return PasswordStrength::VeryWeak;
    }

    let mut score = 0;
    if length >= 8 {
        score += 1;
    }
    if length >= 12 {
        score += 1;
    }
    score += CharacterClasses::of(password).count();

    let lowered = password.to_lowercase();
    if COMMON_PASSWORD_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
    {
        score -= 2;
    }

    match score {
        s if s <= 2 => PasswordStrength::Weak,
        s if s <= 4 => PasswordStrength::Medium,
        5 => PasswordStrength::Strong,
        _ => PasswordStrength::VeryStrong,
    }
}

/// Case-insensitive exact match against the deny-list.
pub fn is_common_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|common| *common == lowered)
}

// =============================================================================
// Hashing
// =============================================================================

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes (time cost)
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashingCost {
    fn hasher(&self) -> DomainResult<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| DomainError::internal(format!("Invalid hashing cost: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hash a password with the default cost.
pub fn hash_password(password: &str) -> DomainResult<String> {
    hash_password_with_cost(password, &HashingCost::default())
}

/// Hash a password with an explicit cost.
pub fn hash_password_with_cost(password: &str, cost: &HashingCost) -> DomainResult<String> {
    if password.is_empty() {
        return Err(DomainError::password("password is required"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = cost
        .hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DomainError::internal(format!("Password hash failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored digest.
///
/// The digest carries its own parameters, so digests produced with any
/// [`HashingCost`] verify here.
pub fn verify_password(password: &str, digest: &str) -> DomainResult<()> {
    if password.is_empty() {
        return Err(DomainError::password("password is required"));
    }
    if digest.is_empty() {
        return Err(DomainError::password("password hash is required"));
    }

    let parsed = PasswordHash::new(digest)
        .map_err(|_| DomainError::password("invalid password hash format"))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| DomainError::InvalidCredentials)
}

// =============================================================================
// Value Object
// =============================================================================

/// Hashed password value object.
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

// Don't expose hash in debug output
impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Validate against the default policy, then hash.
    pub fn new(plain_text: &str) -> DomainResult<Self> {
        Self::with_policy(plain_text, &PasswordRequirements::default(), &HashingCost::default())
    }

    /// Validate against `requirements`, then hash with `cost`.
    pub fn with_policy(
        plain_text: &str,
        requirements: &PasswordRequirements,
        cost: &HashingCost,
    ) -> DomainResult<Self> {
        requirements.validate(plain_text)?;
        let hash = hash_password_with_cost(plain_text, cost)?;
        Ok(Self { hash })
    }

    /// Wrap an existing digest (from storage).
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// True if `plain_text` matches this digest.
    pub fn verify(&self, plain_text: &str) -> bool {
        verify_password(plain_text, &self.hash).is_ok()
    }
}

impl From<Password> for String {
    fn from(password: Password) -> Self {
        password.hash
    }
}
