//! Target platform description: type widths, char signedness, endianness.
//!
//! The tokenizer and value-flow consult the platform for sizeof folding,
//! integer promotion widths and overflow detection. Presets cover the
//! common targets; arbitrary platforms load from JSON.

use serde::Deserialize;
use strum::{Display, EnumString};

use crate::errors::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    Little,
    Big,
}

/// Sizes are in bytes; `CHAR_BIT` is fixed at 8.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Platform {
    pub sizeof_short: u32,
    pub sizeof_int: u32,
    pub sizeof_long: u32,
    pub sizeof_long_long: u32,
    pub sizeof_pointer: u32,
    pub sizeof_size_t: u32,
    pub sizeof_wchar_t: u32,
    pub char_is_signed: bool,
    pub endianness: Endianness,
}

impl Default for Platform {
    fn default() -> Self {
        Self::unix64()
    }
}

impl Platform {
    #[must_use]
    pub fn unix32() -> Self {
        Self {
            sizeof_short: 2,
            sizeof_int: 4,
            sizeof_long: 4,
            sizeof_long_long: 8,
            sizeof_pointer: 4,
            sizeof_size_t: 4,
            sizeof_wchar_t: 4,
            char_is_signed: true,
            endianness: Endianness::Little,
        }
    }

    #[must_use]
    pub fn unix64() -> Self {
        Self {
            sizeof_long: 8,
            sizeof_pointer: 8,
            sizeof_size_t: 8,
            ..Self::unix32()
        }
    }

    #[must_use]
    pub fn win32() -> Self {
        Self {
            sizeof_wchar_t: 2,
            ..Self::unix32()
        }
    }

    #[must_use]
    pub fn win64() -> Self {
        Self {
            sizeof_pointer: 8,
            sizeof_size_t: 8,
            sizeof_wchar_t: 2,
            ..Self::unix32()
        }
    }

    /// Resolves a `--platform=<name>` style preset.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "unix32" => Some(Self::unix32()),
            "unix64" => Some(Self::unix64()),
            "win32" => Some(Self::win32()),
            "win64" => Some(Self::win64()),
            _ => None,
        }
    }

    /// Loads a platform definition from JSON.
    pub fn from_json(json: &str) -> AnalysisResult<Self> {
        let platform: Self = serde_json::from_str(json).map_err(|e| AnalysisError::BadConfig {
            message: format!("bad platform definition: {e}"),
        })?;
        if platform.sizeof_int == 0 || platform.sizeof_pointer == 0 {
            return Err(AnalysisError::BadConfig {
                message: "platform type sizes must be non-zero".to_owned(),
            });
        }
        Ok(platform)
    }

    #[must_use]
    pub fn int_bits(&self) -> u32 {
        self.sizeof_int * 8
    }

    #[must_use]
    pub fn long_bits(&self) -> u32 {
        self.sizeof_long * 8
    }

    #[must_use]
    pub fn long_long_bits(&self) -> u32 {
        self.sizeof_long_long * 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(Platform::unix64().sizeof_long, 8);
        assert_eq!(Platform::win64().sizeof_long, 4);
        assert_eq!(Platform::from_name("win32").unwrap().sizeof_wchar_t, 2);
        assert!(Platform::from_name("vax").is_none());
    }

    #[test]
    fn json_round_trip() {
        let p = Platform::from_json(
            r#"{"sizeof_short":2,"sizeof_int":2,"sizeof_long":4,"sizeof_long_long":8,
                "sizeof_pointer":2,"sizeof_size_t":2,"sizeof_wchar_t":2,
                "char_is_signed":false,"endianness":"big"}"#,
        )
        .unwrap();
        assert_eq!(p.int_bits(), 16);
        assert_eq!(p.endianness, Endianness::Big);
        assert!(!p.char_is_signed);
    }
}
