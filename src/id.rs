//! Code for handling IDs
use unicase::UniCase;

macro_rules! define_id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            serde::Deserialize,
            Debug,
            serde::Serialize,
        )]
        pub struct $name(pub std::sync::Arc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(std::sync::Arc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(std::sync::Arc::from(s))
            }
        }

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                $name(std::sync::Arc::from(id))
            }

            /// The ID as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id_type!(
    /// The name of a series (column) in a time series, e.g. `demand` or `total`
    SeriesID
);
define_id_type!(
    /// The name of a generation source, e.g. `solar` or `wind`
    SourceID
);

/// Normalise a user-supplied name so that it can be compared case-insensitively.
///
/// Leading and trailing whitespace is ignored.
pub fn normalise_name(name: &str) -> UniCase<&str> {
    UniCase::new(name.trim())
}

/// Whether two user-supplied names refer to the same thing
pub fn names_match(a: &str, b: &str) -> bool {
    normalise_name(a) == normalise_name(b)
}
