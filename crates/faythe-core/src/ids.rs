//! Strongly-typed identifiers for Faythe resources.
//!
//! The service treats identifiers as opaque strings. Wrapping each kind in its
//! own type keeps a scaler id from being passed where a cloud id belongs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Common view over the identifier newtypes, used when building request paths.
pub trait Identifier: AsRef<str> {
    /// Returns true when the identifier is empty or whitespace.
    fn is_blank(&self) -> bool {
        self.as_ref().trim().is_empty()
    }
}

/// Macro to generate opaque string identifier types.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Converts to the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Identifier for $name {}

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

id_type!(CloudId, "Cloud identifier (derived by the service from the provider auth URL)");
id_type!(Provider, "Cloud provider name, e.g. `openstack`");
id_type!(ScalerId, "Scaler identifier, scoped to a cloud");
id_type!(HealerId, "Healer identifier, scoped to a cloud");
id_type!(SilenceId, "Silence identifier, scoped to a cloud");
id_type!(Username, "Faythe user name");
