//! Coupon code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CouponCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponCodeError {
    /// The input is shorter than the minimum length after trimming.
    #[error("coupon code must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input is longer than the maximum length.
    #[error("coupon code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains something other than ASCII letters, digits or `-`.
    #[error("coupon code may only contain letters, digits and '-' (found {0:?})")]
    InvalidCharacter(char),
}

/// A campaign coupon code.
///
/// Codes are case-insensitive for customers, so they are stored upper-cased.
///
/// ## Constraints
///
/// - Length: 3-32 characters after trimming
/// - ASCII letters, digits and `-` only
///
/// ## Examples
///
/// ```
/// use bazaar_core::CouponCode;
///
/// assert_eq!(CouponCode::parse(" spring-25 ").unwrap().as_str(), "SPRING-25");
/// assert!(CouponCode::parse("ab").is_err());
/// assert!(CouponCode::parse("50% OFF").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    pub const MIN_LENGTH: usize = 3;
    pub const MAX_LENGTH: usize = 32;

    /// Parse a `CouponCode` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is outside 3-32 characters or
    /// contains characters other than ASCII alphanumerics and `-`.
    pub fn parse(s: &str) -> Result<Self, CouponCodeError> {
        let trimmed = s.trim();

        if trimmed.len() < Self::MIN_LENGTH {
            return Err(CouponCodeError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        if trimmed.len() > Self::MAX_LENGTH {
            return Err(CouponCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(c) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
        {
            return Err(CouponCodeError::InvalidCharacter(c));
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CouponCode {
    type Err = CouponCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CouponCode {
    type Error = CouponCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CouponCode> for String {
    fn from(code: CouponCode) -> Self {
        code.0
    }
}
