//! Validated text values stored in the directory.
//!
//! All of them share the same shape: trimmed, non-empty, bounded length.
//! They differ only in the limit and in the error message field name.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors produced when validating a text value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The value is empty once surrounding whitespace is removed.
    #[error("{field} cannot be empty")]
    Empty {
        /// Which value failed.
        field: &'static str,
    },
    /// The value exceeds its length limit (in characters).
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Which value failed.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
}

macro_rules! define_text {
    ($(#[$meta:meta])* $name:ident, $field:literal, $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Maximum length in characters.
            pub const MAX_LENGTH: usize = $max;

            /// Trim and validate.
            ///
            /// # Errors
            ///
            /// Returns [`ValueError`] if the trimmed value is empty or too long.
            pub fn parse(s: &str) -> Result<Self, ValueError> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ValueError::Empty { field: $field });
                }
                if trimmed.chars().count() > Self::MAX_LENGTH {
                    return Err(ValueError::TooLong {
                        field: $field,
                        max: Self::MAX_LENGTH,
                    });
                }
                Ok(Self(trimmed.to_owned()))
            }

            /// Borrow the validated text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_text!(
    /// Type tag of an address node, e.g. `country` or `city`.
    AddressKind,
    "address type",
    64
);

define_text!(
    /// A human-assigned name registered for an address node.
    PlaceName,
    "name",
    255
);

define_text!(
    /// Catalog item name.
    ItemName,
    "item name",
    255
);

define_text!(
    /// Role name, e.g. `admin`.
    RoleName,
    "role name",
    30
);
