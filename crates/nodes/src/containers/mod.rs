// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "symphonia")]
pub mod decode;
pub mod wav;

#[cfg(feature = "symphonia")]
pub use decode::from_container_bytes;
pub use wav::{quantize_i16, to_wav_bytes};

/// Container format a provider claims to have returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerHint {
    Wav,
    Mp3,
    Ogg,
    Flac,
    Unknown,
}

impl ContainerHint {
    pub const fn extension(self) -> Option<&'static str> {
        match self {
            Self::Wav => Some("wav"),
            Self::Mp3 => Some("mp3"),
            Self::Ogg => Some("ogg"),
            Self::Flac => Some("flac"),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for ContainerHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension().unwrap_or("audio"))
    }
}

impl FromStr for ContainerHint {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "wav" | "wave" => Self::Wav,
            "mp3" => Self::Mp3,
            "ogg" | "oga" | "opus" => Self::Ogg,
            "flac" => Self::Flac,
            _ => Self::Unknown,
        })
    }
}
