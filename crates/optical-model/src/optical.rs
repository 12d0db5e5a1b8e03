//! Optical signal parameters: rates, modulation formats, fiber and
//! amplifier classes, and the Q-value carried by evaluated paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Line rate of a transponder signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rate {
    R100G,
    R150G,
    R200G,
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rate::R100G => "R100G",
            Rate::R150G => "R150G",
            Rate::R200G => "R200G",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Rate {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "R100G" => Ok(Rate::R100G),
            "R150G" => Ok(Rate::R150G),
            "R200G" => Ok(Rate::R200G),
            other => Err(ModelError::UnknownToken(other.to_string())),
        }
    }
}

/// Modulation format of a transponder signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModulationFormat {
    #[serde(rename = "bpsk")]
    Bpsk,
    #[serde(rename = "qpsk")]
    Qpsk,
    #[serde(rename = "qam8")]
    Qam8,
    #[serde(rename = "qam16")]
    Qam16,
    #[serde(rename = "dp-qpsk")]
    DpQpsk,
    #[serde(rename = "dp-qam8")]
    DpQam8,
    #[serde(rename = "dp-qam16")]
    DpQam16,
    #[serde(rename = "dc-dp-bpsk")]
    DcDpBpsk,
    #[serde(rename = "dc-dp-qam8")]
    DcDpQam8,
    #[serde(rename = "dc-dp-qam16")]
    DcDpQam16,
}

impl ModulationFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModulationFormat::Bpsk => "bpsk",
            ModulationFormat::Qpsk => "qpsk",
            ModulationFormat::Qam8 => "qam8",
            ModulationFormat::Qam16 => "qam16",
            ModulationFormat::DpQpsk => "dp-qpsk",
            ModulationFormat::DpQam8 => "dp-qam8",
            ModulationFormat::DpQam16 => "dp-qam16",
            ModulationFormat::DcDpBpsk => "dc-dp-bpsk",
            ModulationFormat::DcDpQam8 => "dc-dp-qam8",
            ModulationFormat::DcDpQam16 => "dc-dp-qam16",
        }
    }
}

impl fmt::Display for ModulationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModulationFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bpsk" => Ok(ModulationFormat::Bpsk),
            "qpsk" => Ok(ModulationFormat::Qpsk),
            "qam8" => Ok(ModulationFormat::Qam8),
            "qam16" => Ok(ModulationFormat::Qam16),
            "dp-qpsk" => Ok(ModulationFormat::DpQpsk),
            "dp-qam8" => Ok(ModulationFormat::DpQam8),
            "dp-qam16" => Ok(ModulationFormat::DpQam16),
            "dc-dp-bpsk" => Ok(ModulationFormat::DcDpBpsk),
            "dc-dp-qam8" => Ok(ModulationFormat::DcDpQam8),
            "dc-dp-qam16" => Ok(ModulationFormat::DcDpQam16),
            other => Err(ModelError::UnknownToken(other.to_string())),
        }
    }
}

/// Fiber class determining nonlinear index, dispersion and effective area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FiberType {
    #[serde(rename = "smf")]
    Smf,
    #[serde(rename = "dsf")]
    Dsf,
}

impl FromStr for FiberType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smf" => Ok(FiberType::Smf),
            "dsf" => Ok(FiberType::Dsf),
            other => Err(ModelError::UnknownToken(other.to_string())),
        }
    }
}

impl fmt::Display for FiberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FiberType::Smf => "smf",
            FiberType::Dsf => "dsf",
        };
        write!(f, "{s}")
    }
}

/// Amplifier class determining the noise figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AmpType {
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "LowGainAmp")]
    LowGain,
    #[serde(rename = "HighGainAmp")]
    HighGain,
}

impl FromStr for AmpType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(AmpType::Standard),
            "LowGainAmp" => Ok(AmpType::LowGain),
            "HighGainAmp" => Ok(AmpType::HighGain),
            other => Err(ModelError::UnknownToken(other.to_string())),
        }
    }
}

impl fmt::Display for AmpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AmpType::Standard => "standard",
            AmpType::LowGain => "LowGainAmp",
            AmpType::HighGain => "HighGainAmp",
        };
        write!(f, "{s}")
    }
}

/// (rate, modulation format) pair evaluated as one QoT combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OchParam {
    pub rate: Rate,
    pub mod_format: ModulationFormat,
}

impl OchParam {
    pub fn new(rate: Rate, mod_format: ModulationFormat) -> Self {
        OchParam { rate, mod_format }
    }
}

impl fmt::Display for OchParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.rate, self.mod_format)
    }
}

/// Computed Q-value and the threshold it was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QValue {
    pub value: f64,
    pub threshold: f64,
}

impl QValue {
    pub fn new(value: f64, threshold: f64) -> Self {
        QValue { value, threshold }
    }

    pub fn passes(&self) -> bool {
        self.value >= self.threshold
    }

    pub fn margin(&self) -> f64 {
        self.value - self.threshold
    }
}
