//! Domain models for the chit-fund service.
//!
//! These are the core types shared across all crates.

use thiserror::Error;

/// Returned when a string does not name any variant of a wire enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {enum_name} value: {value}")]
pub struct UnknownVariant {
    pub enum_name: &'static str,
    pub value: String,
}

/// Defines a fieldless enum together with its single wire-name table.
///
/// The table drives serde, `Display`, `FromStr` and `as_str`, so the
/// API and storage layers share one bidirectional mapping.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant, )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err($crate::models::UnknownVariant {
                        enum_name: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod chit;
pub mod member;
pub mod payment;
pub mod payout;
pub mod refresh_token;
pub mod user;

/// Amounts in minor currency units (paisa). Never floating point.
pub type Paisa = i64;
