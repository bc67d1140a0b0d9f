//! Newtype IDs for type-safe entity references.
//!
//! The remote store hands out identifiers in whatever shape the column has:
//! integer keys for catalog tables, UUID strings for users, and occasionally
//! numbers that were serialized as strings. Every ID here is stored in one
//! canonical string form so that `"42"`, `42` and `" 42 "` compare equal.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.

use serde::Deserialize;

/// Coerce a raw identifier into its canonical string form.
///
/// Surrounding whitespace is removed. Nothing else is rewritten, so UUIDs
/// keep their case and numeric strings keep their digits.
#[must_use]
pub fn canonicalize(raw: &str) -> String {
    raw.trim().to_owned()
}

/// Any JSON shape an identifier can arrive in.
#[doc(hidden)]
#[derive(Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl RawId {
    #[doc(hidden)]
    #[must_use]
    pub fn into_canonical(self) -> String {
        match self {
            Self::Text(s) => canonicalize(&s),
            Self::Signed(n) => n.to_string(),
            Self::Unsigned(n) => n.to_string(),
        }
    }
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string, `Deserialize` from a string or an integer
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<&str>`, `From<String>`, `From<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use bazaar_core::define_id;
/// define_id!(ShopId);
/// define_id!(OrderId);
///
/// let shop = ShopId::from(7);
/// assert_eq!(shop, ShopId::new(" 7 "));
///
/// // These are different types, so this won't compile:
/// // let _: ShopId = OrderId::from(7);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID, coercing it to canonical form.
            #[must_use]
            pub fn new(id: impl AsRef<str>) -> Self {
                Self($crate::types::id::canonicalize(id.as_ref()))
            }

            /// Get the canonical string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self::new(id)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let raw = <$crate::types::id::RawId as ::serde::Deserialize>::deserialize(
                    deserializer,
                )?;
                let id = raw.into_canonical();
                if id.is_empty() {
                    return Err(<D::Error as ::serde::de::Error>::custom(concat!(
                        stringify!($name),
                        " cannot be empty"
                    )));
                }
                Ok(Self(id))
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(SellerId);
define_id!(CategoryId);
define_id!(CampaignId);
