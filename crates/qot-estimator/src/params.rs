//! Quality-calculation parameter tables.
//!
//! Defaults match the values the planner ships with; deployments override
//! them from a JSON file. OSNR→Q polynomial coefficients and thresholds are
//! keyed `vendor/rate/mod-format` and intentionally empty by default,
//! since they are per-procurement data.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use optical_model::{AmpType, FiberType, ModulationFormat, OchParam, Rate};

use crate::{QotError, Result};

/// Parameter set consumed by the estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityParameters {
    /// Noise figure [dB] by amplifier type.
    pub noise_figures: HashMap<AmpType, f64>,
    /// Effective area [µm²] by fiber type.
    pub aeff: HashMap<FiberType, f64>,
    /// Nonlinear refractive index [m²/W] by fiber type.
    pub n2: HashMap<FiberType, f64>,
    /// Chromatic dispersion [ps/nm/km] by fiber type.
    pub cd: HashMap<FiberType, f64>,
    /// Fiber input power [dBm] by fiber type.
    pub pout: HashMap<FiberType, f64>,
    /// Seed power [dBm] of the synthetic pre-amplifier span.
    pub preamp_pout_dbm: f64,
    /// Planck constant [J·s].
    pub planck_constant: f64,
    /// Speed of light [m/s].
    pub speed_of_light: f64,
    /// Reference bandwidth [GHz].
    pub delta_f_ghz: f64,
    /// Representative channel frequency [THz].
    pub user_frequency_thz: f64,
    /// Numeric rate [Gbps] by rate token.
    pub rates: HashMap<Rate, f64>,
    /// Bits per symbol by modulation format.
    pub bit_symbol: HashMap<ModulationFormat, f64>,
    /// Power spectral factor by modulation format.
    pub power_spectral: HashMap<ModulationFormat, f64>,
    /// Rate/format combinations evaluated during WDM calculation,
    /// e.g. `"R100G/dp-qpsk"`.
    pub rate_mod_format_pattern: Vec<String>,
    /// OSNR→Q polynomial coefficients (highest order first), keyed
    /// `vendor/rate/mod-format`.
    pub osnr_q_constants: HashMap<String, Vec<f64>>,
    /// Minimum acceptable Q [dB], keyed `vendor/rate/mod-format`.
    pub q_thresholds: HashMap<String, f64>,
}

impl Default for QualityParameters {
    fn default() -> Self {
        QualityParameters {
            noise_figures: HashMap::from([(AmpType::LowGain, 8.8), (AmpType::HighGain, 6.6)]),
            aeff: HashMap::from([(FiberType::Smf, 72.0), (FiberType::Dsf, 45.0)]),
            n2: HashMap::from([(FiberType::Smf, 2.6e-20), (FiberType::Dsf, 2.6e-20)]),
            cd: HashMap::from([(FiberType::Smf, 16.0), (FiberType::Dsf, 0.0001)]),
            pout: HashMap::from([(FiberType::Smf, 1.0), (FiberType::Dsf, -5.0)]),
            preamp_pout_dbm: 4.0,
            planck_constant: 6.62607004e-34,
            speed_of_light: 299_792_458.0,
            delta_f_ghz: 12.5,
            user_frequency_thz: 193.1,
            rates: HashMap::from([
                (Rate::R100G, 100.0),
                (Rate::R150G, 150.0),
                (Rate::R200G, 200.0),
            ]),
            bit_symbol: HashMap::from([
                (ModulationFormat::Bpsk, 1.0),
                (ModulationFormat::Qpsk, 2.0),
                (ModulationFormat::Qam8, 3.0),
                (ModulationFormat::Qam16, 4.0),
                (ModulationFormat::DpQpsk, 4.0),
                (ModulationFormat::DpQam8, 6.0),
                (ModulationFormat::DpQam16, 8.0),
                (ModulationFormat::DcDpBpsk, 2.0),
                (ModulationFormat::DcDpQam8, 6.0),
                (ModulationFormat::DcDpQam16, 8.0),
            ]),
            power_spectral: HashMap::from([
                (ModulationFormat::Bpsk, 1.0),
                (ModulationFormat::Qpsk, 1.0),
                (ModulationFormat::Qam8, 1.0),
                (ModulationFormat::Qam16, 1.0),
                (ModulationFormat::DpQpsk, 0.5),
                (ModulationFormat::DpQam8, 0.5),
                (ModulationFormat::DpQam16, 0.5),
                (ModulationFormat::DcDpBpsk, 0.5),
                (ModulationFormat::DcDpQam8, 0.5),
                (ModulationFormat::DcDpQam16, 0.5),
            ]),
            rate_mod_format_pattern: vec!["R100G/dp-qpsk".into(), "R200G/dp-qam16".into()],
            osnr_q_constants: HashMap::new(),
            q_thresholds: HashMap::new(),
        }
    }
}

fn param_key(vendor: &str, rate: Rate, mod_format: ModulationFormat) -> String {
    format!("{vendor}/{rate}/{mod_format}")
}

impl QualityParameters {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        QualityParameters::from_json_str(&text)
    }

    pub fn noise_figure(&self, amp_type: AmpType) -> Result<f64> {
        self.noise_figures
            .get(&amp_type)
            .copied()
            .ok_or(QotError::MissingNoiseFigure(amp_type))
    }

    pub fn aeff(&self, fiber_type: FiberType) -> Result<f64> {
        self.aeff
            .get(&fiber_type)
            .copied()
            .ok_or(QotError::MissingFiberParameter("Aeff", fiber_type))
    }

    pub fn n2(&self, fiber_type: FiberType) -> Result<f64> {
        self.n2
            .get(&fiber_type)
            .copied()
            .ok_or(QotError::MissingFiberParameter("N2", fiber_type))
    }

    pub fn cd(&self, fiber_type: FiberType) -> Result<f64> {
        self.cd
            .get(&fiber_type)
            .copied()
            .ok_or(QotError::MissingFiberParameter("CD", fiber_type))
    }

    pub fn pout(&self, fiber_type: FiberType) -> Result<f64> {
        self.pout
            .get(&fiber_type)
            .copied()
            .ok_or(QotError::MissingFiberParameter("Pout", fiber_type))
    }

    pub fn rate_value(&self, rate: Rate) -> Result<f64> {
        self.rates
            .get(&rate)
            .copied()
            .ok_or(QotError::MissingRateValue(rate))
    }

    pub fn bit_symbol(&self, mod_format: ModulationFormat) -> Result<f64> {
        self.bit_symbol
            .get(&mod_format)
            .copied()
            .ok_or(QotError::MissingFormatParameter("bitSymbol", mod_format))
    }

    pub fn power_spectral(&self, mod_format: ModulationFormat) -> Result<f64> {
        self.power_spectral
            .get(&mod_format)
            .copied()
            .ok_or(QotError::MissingFormatParameter("powerSpectral", mod_format))
    }

    pub fn delta_f_hz(&self) -> f64 {
        self.delta_f_ghz * 1e9
    }

    pub fn user_frequency_hz(&self) -> f64 {
        self.user_frequency_thz * 1e12
    }

    /// Rate/format combinations to evaluate during WDM calculation.
    /// Malformed entries are dropped with a warning.
    pub fn evaluation_pattern(&self) -> Vec<OchParam> {
        let mut params = Vec::with_capacity(self.rate_mod_format_pattern.len());
        for entry in &self.rate_mod_format_pattern {
            match parse_pattern_entry(entry) {
                Some(param) => params.push(param),
                None => warn!(entry, "ignoring malformed rate/mod-format pattern entry"),
            }
        }
        params
    }

    pub fn osnr_q_constants(
        &self,
        vendor: &str,
        rate: Rate,
        mod_format: ModulationFormat,
    ) -> Option<&[f64]> {
        self.osnr_q_constants
            .get(&param_key(vendor, rate, mod_format))
            .map(|v| v.as_slice())
    }

    pub fn q_threshold(&self, vendor: &str, rate: Rate, mod_format: ModulationFormat) -> Option<f64> {
        self.q_thresholds
            .get(&param_key(vendor, rate, mod_format))
            .copied()
    }

    pub fn set_osnr_q_constants(
        &mut self,
        vendor: &str,
        rate: Rate,
        mod_format: ModulationFormat,
        constants: Vec<f64>,
    ) {
        self.osnr_q_constants
            .insert(param_key(vendor, rate, mod_format), constants);
    }

    pub fn set_q_threshold(
        &mut self,
        vendor: &str,
        rate: Rate,
        mod_format: ModulationFormat,
        threshold: f64,
    ) {
        self.q_thresholds
            .insert(param_key(vendor, rate, mod_format), threshold);
    }
}

fn parse_pattern_entry(entry: &str) -> Option<OchParam> {
    let (rate, mod_format) = entry.split_once('/')?;
    Some(OchParam::new(
        rate.parse().ok()?,
        mod_format.parse().ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_tables_carry_shipped_values() {
        let params = QualityParameters::default();
        assert!((params.noise_figure(AmpType::LowGain).unwrap() - 8.8).abs() < 1e-12);
        assert!((params.noise_figure(AmpType::HighGain).unwrap() - 6.6).abs() < 1e-12);
        assert!(params.noise_figure(AmpType::Standard).is_err());
        assert!((params.aeff(FiberType::Dsf).unwrap() - 45.0).abs() < 1e-12);
        assert!((params.pout(FiberType::Smf).unwrap() - 1.0).abs() < 1e-12);
        assert!((params.delta_f_hz() - 12.5e9).abs() < 1.0);
    }

    #[test]
    fn evaluation_pattern_parses_shipped_defaults() {
        let params = QualityParameters::default();
        let pattern = params.evaluation_pattern();
        assert_eq!(
            pattern,
            vec![
                OchParam::new(Rate::R100G, ModulationFormat::DpQpsk),
                OchParam::new(Rate::R200G, ModulationFormat::DpQam16),
            ]
        );
    }

    #[test]
    fn malformed_pattern_entries_are_dropped() {
        let mut params = QualityParameters::default();
        params.rate_mod_format_pattern = vec!["R100G/dp-qpsk".into(), "bogus".into(), "R999G/x".into()];
        assert_eq!(params.evaluation_pattern().len(), 1);
    }

    #[test]
    fn constants_lookup_is_keyed_by_vendor_rate_format() {
        let mut params = QualityParameters::default();
        params.set_osnr_q_constants("acme", Rate::R100G, ModulationFormat::DpQpsk, vec![1.0, 0.0]);
        params.set_q_threshold("acme", Rate::R100G, ModulationFormat::DpQpsk, 6.0);
        assert!(params
            .osnr_q_constants("acme", Rate::R100G, ModulationFormat::DpQpsk)
            .is_some());
        assert!(params
            .osnr_q_constants("acme", Rate::R200G, ModulationFormat::DpQpsk)
            .is_none());
        assert!(params
            .q_threshold("other", Rate::R100G, ModulationFormat::DpQpsk)
            .is_none());
    }

    #[test]
    fn loads_overrides_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"preamp_pout_dbm": 2.5, "q_thresholds": {{"acme/R100G/dp-qpsk": 6.5}}}}"#
        )
        .unwrap();
        let params = QualityParameters::from_file(file.path()).unwrap();
        assert!((params.preamp_pout_dbm - 2.5).abs() < 1e-12);
        // Unspecified sections keep their defaults.
        assert!((params.user_frequency_thz - 193.1).abs() < 1e-12);
        assert_eq!(
            params.q_threshold("acme", Rate::R100G, ModulationFormat::DpQpsk),
            Some(6.5)
        );
    }
}
