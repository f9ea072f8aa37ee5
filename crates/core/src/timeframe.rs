//! Terminal chart timeframes and their native integer codes.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M10,
    M12,
    M15,
    M20,
    M30,
    H1,
    H2,
    H3,
    H4,
    H6,
    H8,
    H12,
    D1,
    W1,
    MN1,
}

impl Timeframe {
    const ALL: [Self; 21] = [
        Self::M1,
        Self::M2,
        Self::M3,
        Self::M4,
        Self::M5,
        Self::M6,
        Self::M10,
        Self::M12,
        Self::M15,
        Self::M20,
        Self::M30,
        Self::H1,
        Self::H2,
        Self::H3,
        Self::H4,
        Self::H6,
        Self::H8,
        Self::H12,
        Self::D1,
        Self::W1,
        Self::MN1,
    ];

    /// Integer code the terminal uses for this timeframe.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::M1 => 1,
            Self::M2 => 2,
            Self::M3 => 3,
            Self::M4 => 4,
            Self::M5 => 5,
            Self::M6 => 6,
            Self::M10 => 10,
            Self::M12 => 12,
            Self::M15 => 15,
            Self::M20 => 20,
            Self::M30 => 30,
            Self::H1 => 0x4000 | 1,
            Self::H2 => 0x4000 | 2,
            Self::H3 => 0x4000 | 3,
            Self::H4 => 0x4000 | 4,
            Self::H6 => 0x4000 | 6,
            Self::H8 => 0x4000 | 8,
            Self::H12 => 0x4000 | 12,
            Self::D1 => 0x4000 | 24,
            Self::W1 => 0x8000 | 1,
            Self::MN1 => 0xC000 | 1,
        }
    }

    /// Bar length, `None` for monthly bars.
    #[must_use]
    pub fn duration(self) -> Option<Duration> {
        let minutes = match self {
            Self::M1 => 1,
            Self::M2 => 2,
            Self::M3 => 3,
            Self::M4 => 4,
            Self::M5 => 5,
            Self::M6 => 6,
            Self::M10 => 10,
            Self::M12 => 12,
            Self::M15 => 15,
            Self::M20 => 20,
            Self::M30 => 30,
            Self::H1 => 60,
            Self::H2 => 120,
            Self::H3 => 180,
            Self::H4 => 240,
            Self::H6 => 360,
            Self::H8 => 480,
            Self::H12 => 720,
            Self::D1 => 1440,
            Self::W1 => 10080,
            Self::MN1 => return None,
        };
        Some(Duration::minutes(minutes))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "M1",
            Self::M2 => "M2",
            Self::M3 => "M3",
            Self::M4 => "M4",
            Self::M5 => "M5",
            Self::M6 => "M6",
            Self::M10 => "M10",
            Self::M12 => "M12",
            Self::M15 => "M15",
            Self::M20 => "M20",
            Self::M30 => "M30",
            Self::H1 => "H1",
            Self::H2 => "H2",
            Self::H3 => "H3",
            Self::H4 => "H4",
            Self::H6 => "H6",
            Self::H8 => "H8",
            Self::H12 => "H12",
            Self::D1 => "D1",
            Self::W1 => "W1",
            Self::MN1 => "MN1",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let wanted = s.trim().to_ascii_uppercase();
        let wanted = wanted.strip_prefix("TIMEFRAME_").unwrap_or(&wanted);
        Self::ALL
            .into_iter()
            .find(|tf| tf.as_str() == wanted)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid timeframe: {s}. Expected one of M1..M30, H1..H12, D1, W1, MN1"
                )
            })
    }
}

impl TryFrom<String> for Timeframe {
    type Error = anyhow::Error;

    fn try_from(value: String) -> anyhow::Result<Self> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.as_str().to_string()
    }
}
