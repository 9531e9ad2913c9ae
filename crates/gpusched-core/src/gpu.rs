//! GPU model types found in cluster traces

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::SchedError;

/// GPU model requested by a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GpuType {
    /// CPU-only job
    Cpu,
    /// Any other or unlabelled GPU model
    Misc,
    T4,
    P100,
    V100,
}

impl GpuType {
    /// Integer code used in exported job statistics and state vectors
    pub fn code(&self) -> u8 {
        match self {
            GpuType::Cpu => 0,
            GpuType::Misc => 1,
            GpuType::T4 => 2,
            GpuType::P100 => 3,
            GpuType::V100 => 4,
        }
    }
}

impl fmt::Display for GpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuType::Cpu => write!(f, "CPU"),
            GpuType::Misc => write!(f, "MISC"),
            GpuType::T4 => write!(f, "T4"),
            GpuType::P100 => write!(f, "P100"),
            GpuType::V100 => write!(f, "V100"),
        }
    }
}

impl FromStr for GpuType {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPU" => Ok(GpuType::Cpu),
            "MISC" => Ok(GpuType::Misc),
            "T4" => Ok(GpuType::T4),
            "P100" => Ok(GpuType::P100),
            "V100" | "V100M32" => Ok(GpuType::V100),
            _ => Err(SchedError::parse("gpu_type", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_type_codes() {
        assert_eq!(GpuType::Cpu.code(), 0);
        assert_eq!(GpuType::V100.code(), 4);
    }

    #[test]
    fn test_gpu_type_parse() {
        assert_eq!("t4".parse::<GpuType>().unwrap(), GpuType::T4);
        assert_eq!("V100M32".parse::<GpuType>().unwrap(), GpuType::V100);
        assert!("A100".parse::<GpuType>().is_err());
    }

    #[test]
    fn test_gpu_type_display() {
        assert_eq!(GpuType::P100.to_string(), "P100");
        assert_eq!(GpuType::Misc.to_string(), "MISC");
    }
}
