//! Declarative helpers for the fixed tables used across the crate:
//! error codes, protocol versions and the bulb mode/scene catalogs.

/// Defines numeric error code constants and a `get_error_message` lookup.
macro_rules! define_error_codes {
    ($($name:ident = $code:literal => $msg:literal),* $(,)?) => {
        $(
            pub const $name: u32 = $code;
        )*

        /// Returns the human readable message for an error code.
        pub fn get_error_message(code: u32) -> &'static str {
            match code {
                $($code => $msg,)*
                _ => "Unknown Error",
            }
        }
    };
}

/// Defines the `Version` enum with its wire string and numeric value.
macro_rules! define_version {
    ($($variant:ident = ($text:literal, $val:literal)),* $(,)?) => {
        /// Tuya LAN protocol version.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Version {
            $($variant,)*
        }

        impl Version {
            /// Every supported version, oldest first.
            pub const ALL: &'static [Version] = &[$(Version::$variant,)*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Version::$variant => $text,)*
                }
            }

            pub fn val(&self) -> f32 {
                match self {
                    $(Version::$variant => $val,)*
                }
            }
        }

        impl std::str::FromStr for Version {
            type Err = $crate::error::GatewayError;

            fn from_str(s: &str) -> $crate::error::Result<Self> {
                match s.trim() {
                    $($text => Ok(Version::$variant),)*
                    other => Err($crate::error::GatewayError::UnsupportedVersion(other.to_string())),
                }
            }
        }

        impl std::fmt::Display for Version {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Defines a closed catalog enum mapping vendor codes to small driver indexes.
///
/// `from_index` is the strict lookup used for commands; `from_code` returns
/// `None` for codes outside the catalog so callers pick their own fallback.
macro_rules! define_catalog {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident = ($code:literal, $index:literal)),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            /// Catalog entries in index order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// Vendor code sent to and received from the device.
            pub fn code(&self) -> &'static str {
                match self {
                    $($name::$variant => $code,)*
                }
            }

            /// Small integer reported upward as the driver value.
            pub fn index(&self) -> u8 {
                match self {
                    $($name::$variant => $index,)*
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)*
                    _ => None,
                }
            }

            pub fn from_index(index: u8) -> Option<Self> {
                match index {
                    $($index => Some($name::$variant),)*
                    _ => None,
                }
            }
        }
    };
}
