//! Per-link physical models.
//!
//! A link is an ordered run of fiber spans and in-line amplifiers described
//! by hierarchical configuration records. The parsed `PhysicalLink` feeds
//! both the route weigher (total span length) and the QoT estimator
//! (per-element loss/gain and type-keyed parameters).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::net::ConnectPoint;
use crate::optical::{AmpType, FiberType};
use crate::{ModelError, Result};

/// One fiber span: loss, class and physical length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberSpan {
    pub span_loss_db: f64,
    pub fiber_type: FiberType,
    pub srlg_length_m: f64,
}

/// One in-line amplifier stage. Gain is NaN when the configuration does not
/// carry it; estimation then yields a NaN quality, which fails any threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmpStage {
    pub gain_db: f64,
    pub amp_type: AmpType,
}

/// One traversable element of a link.
///
/// `PreAmpFiber` is a synthetic zero-loss span appended when a section list
/// ends with an amplifier; it seeds the OSNR stage so span and amplifier
/// ordinals stay aligned, and carries no nonlinear contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhysicalElement {
    Fiber(FiberSpan),
    Amplifier(AmpStage),
    PreAmpFiber,
}

/// Ordered physical model of one topology edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalLink {
    pub elements: Vec<PhysicalElement>,
}

impl PhysicalLink {
    pub fn new(elements: Vec<PhysicalElement>) -> Self {
        PhysicalLink { elements }
    }

    /// Total fiber length [m], the route-search cost of the edge.
    pub fn total_span_m(&self) -> f64 {
        self.elements
            .iter()
            .map(|e| match e {
                PhysicalElement::Fiber(f) => f.srlg_length_m,
                _ => 0.0,
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/* ----------------------------------------------------------------------- *
 * Raw configuration records
 * ----------------------------------------------------------------------- */

#[derive(Debug, Clone, Deserialize)]
struct RawConcatenation {
    #[serde(rename = "fiber-type")]
    fiber_type: Option<String>,
    #[serde(rename = "SRLG-length")]
    srlg_length: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSpan {
    #[serde(rename = "spanloss-base")]
    spanloss_base: Option<f64>,
    #[serde(rename = "link-concatenation", default)]
    link_concatenation: Vec<RawConcatenation>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawIla {
    gain: Option<f64>,
    #[serde(rename = "amp-type")]
    amp_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSection {
    #[serde(default)]
    ila: Option<RawIla>,
    #[serde(default)]
    span: Option<RawSpan>,
}

/// One per-link configuration record.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLinkRecord {
    pub src: ConnectPoint,
    pub dst: ConnectPoint,
    #[serde(rename = "link-type", default)]
    link_type: Option<String>,
    #[serde(default)]
    amplified: bool,
    #[serde(rename = "section-elements", default)]
    sections: Vec<RawSection>,
    #[serde(default)]
    span: Option<RawSpan>,
}

const LINK_TYPE_ROADM_TO_ROADM: &str = "ROADM-TO-ROADM";

fn parse_span(raw: &RawSpan) -> Result<FiberSpan> {
    let span_loss_db = raw
        .spanloss_base
        .ok_or(ModelError::MissingField("spanloss-base"))?;

    let mut fiber_type = None;
    let mut srlg_length_m = 0.0;
    for concat in &raw.link_concatenation {
        if fiber_type.is_none() {
            if let Some(token) = &concat.fiber_type {
                // Use the first definition that is correctly specified.
                fiber_type = Some(token.parse::<FiberType>()?);
            }
        }
        srlg_length_m += concat.srlg_length.unwrap_or(0.0);
    }

    Ok(FiberSpan {
        span_loss_db,
        fiber_type: fiber_type.unwrap_or(FiberType::Smf),
        srlg_length_m,
    })
}

fn parse_ila(raw: &RawIla) -> Result<AmpStage> {
    let amp_type = match &raw.amp_type {
        Some(token) => token.parse::<AmpType>()?,
        None => AmpType::Standard,
    };
    Ok(AmpStage {
        gain_db: raw.gain.unwrap_or(f64::NAN),
        amp_type,
    })
}

fn parse_record(record: &RawLinkRecord) -> Result<PhysicalLink> {
    if let Some(link_type) = &record.link_type {
        if link_type != LINK_TYPE_ROADM_TO_ROADM {
            // Only ROADM-to-ROADM links carry a span model.
            return Ok(PhysicalLink::default());
        }
    }

    let mut elements = Vec::new();
    if record.amplified {
        let mut last_was_amp = false;
        for section in &record.sections {
            if let Some(ila) = &section.ila {
                elements.push(PhysicalElement::Amplifier(parse_ila(ila)?));
                last_was_amp = true;
            } else if let Some(span) = &section.span {
                elements.push(PhysicalElement::Fiber(parse_span(span)?));
                last_was_amp = false;
            }
        }
        if last_was_amp {
            elements.push(PhysicalElement::PreAmpFiber);
        }
    } else if let Some(span) = &record.span {
        elements.push(PhysicalElement::Fiber(parse_span(span)?));
    }

    Ok(PhysicalLink::new(elements))
}

/* ----------------------------------------------------------------------- *
 * Catalog
 * ----------------------------------------------------------------------- */

type LinkKey = (ConnectPoint, ConnectPoint);

/// Parsed physical models for all configured links.
///
/// Records that fail to parse are remembered with their failure reason so a
/// lookup degrades that one edge instead of aborting a whole route search.
#[derive(Debug, Default)]
pub struct LinkModelCatalog {
    links: HashMap<LinkKey, PhysicalLink>,
    invalid: HashMap<LinkKey, String>,
}

impl LinkModelCatalog {
    pub fn new() -> Self {
        LinkModelCatalog::default()
    }

    pub fn from_records(records: Vec<RawLinkRecord>) -> Self {
        let mut catalog = LinkModelCatalog::new();
        for record in records {
            let key = (record.src.clone(), record.dst.clone());
            match parse_record(&record) {
                Ok(link) => {
                    catalog.links.insert(key, link);
                }
                Err(err) => {
                    warn!(src = %record.src, dst = %record.dst, error = %err,
                          "dropping malformed link model");
                    catalog.invalid.insert(key, err.to_string());
                }
            }
        }
        catalog
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<RawLinkRecord> = serde_json::from_str(json)?;
        Ok(LinkModelCatalog::from_records(records))
    }

    pub fn insert(&mut self, src: ConnectPoint, dst: ConnectPoint, link: PhysicalLink) {
        self.links.insert((src, dst), link);
    }

    /// Physical model of the edge `src -> dst`.
    pub fn link_model(&self, src: &ConnectPoint, dst: &ConnectPoint) -> Result<&PhysicalLink> {
        let key = (src.clone(), dst.clone());
        if let Some(link) = self.links.get(&key) {
            return Ok(link);
        }
        if let Some(reason) = self.invalid.get(&key) {
            return Err(ModelError::InvalidLinkModel {
                src: src.clone(),
                dst: dst.clone(),
                reason: reason.clone(),
            });
        }
        Err(ModelError::NoLinkModel(src.clone(), dst.clone()))
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(amplified: bool, sections: &str) -> String {
        format!(
            r#"[{{
                "src": {{"device": "roadm-a", "port": {{"number": 3}}}},
                "dst": {{"device": "roadm-b", "port": {{"number": 3}}}},
                "link-type": "ROADM-TO-ROADM",
                "amplified": {amplified},
                {sections}
            }}]"#
        )
    }

    #[test]
    fn parses_unamplified_span() {
        let json = record_json(
            false,
            r#""span": {
                "spanloss-base": 10.0,
                "link-concatenation": [
                    {"fiber-type": "smf", "SRLG-length": 40000.0},
                    {"SRLG-length": 40000.0}
                ]
            }"#,
        );
        let catalog = LinkModelCatalog::from_json_str(&json).unwrap();
        let link = catalog
            .link_model(&ConnectPoint::of("roadm-a", 3), &ConnectPoint::of("roadm-b", 3))
            .unwrap();
        assert_eq!(link.elements.len(), 1);
        assert!((link.total_span_m() - 80000.0).abs() < 1e-9);
        match &link.elements[0] {
            PhysicalElement::Fiber(f) => {
                assert_eq!(f.fiber_type, FiberType::Smf);
                assert!((f.span_loss_db - 10.0).abs() < 1e-12);
            }
            other => panic!("expected fiber, got {other:?}"),
        }
    }

    #[test]
    fn appends_seed_span_after_trailing_amplifier() {
        let json = record_json(
            true,
            r#""section-elements": [
                {"span": {"spanloss-base": 10.0,
                          "link-concatenation": [{"fiber-type": "smf", "SRLG-length": 80000.0}]}},
                {"ila": {"gain": 20.0, "amp-type": "LowGainAmp"}}
            ]"#,
        );
        let catalog = LinkModelCatalog::from_json_str(&json).unwrap();
        let link = catalog
            .link_model(&ConnectPoint::of("roadm-a", 3), &ConnectPoint::of("roadm-b", 3))
            .unwrap();
        assert_eq!(link.elements.len(), 3);
        assert_eq!(link.elements[2], PhysicalElement::PreAmpFiber);
        // The seed span adds no fiber length.
        assert!((link.total_span_m() - 80000.0).abs() < 1e-9);
    }

    #[test]
    fn amplifier_defaults() {
        let json = record_json(
            true,
            r#""section-elements": [
                {"ila": {}},
                {"span": {"spanloss-base": 8.0,
                          "link-concatenation": [{"SRLG-length": 50000.0}]}}
            ]"#,
        );
        let catalog = LinkModelCatalog::from_json_str(&json).unwrap();
        let link = catalog
            .link_model(&ConnectPoint::of("roadm-a", 3), &ConnectPoint::of("roadm-b", 3))
            .unwrap();
        match &link.elements[0] {
            PhysicalElement::Amplifier(a) => {
                assert_eq!(a.amp_type, AmpType::Standard);
                assert!(a.gain_db.is_nan());
            }
            other => panic!("expected amplifier, got {other:?}"),
        }
        // Fiber type falls back to SMF when no concatenation specifies it.
        match &link.elements[1] {
            PhysicalElement::Fiber(f) => assert_eq!(f.fiber_type, FiberType::Smf),
            other => panic!("expected fiber, got {other:?}"),
        }
    }

    #[test]
    fn missing_span_loss_marks_link_invalid() {
        let json = record_json(false, r#""span": {"link-concatenation": []}"#);
        let catalog = LinkModelCatalog::from_json_str(&json).unwrap();
        let err = catalog
            .link_model(&ConnectPoint::of("roadm-a", 3), &ConnectPoint::of("roadm-b", 3))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidLinkModel { .. }));
    }

    #[test]
    fn unknown_fiber_token_marks_link_invalid() {
        let json = record_json(
            false,
            r#""span": {"spanloss-base": 5.0,
                       "link-concatenation": [{"fiber-type": "hollow-core", "SRLG-length": 1000.0}]}"#,
        );
        let catalog = LinkModelCatalog::from_json_str(&json).unwrap();
        assert!(catalog
            .link_model(&ConnectPoint::of("roadm-a", 3), &ConnectPoint::of("roadm-b", 3))
            .is_err());
    }

    #[test]
    fn unconfigured_link_is_absent() {
        let catalog = LinkModelCatalog::new();
        let err = catalog
            .link_model(&ConnectPoint::of("x", 1), &ConnectPoint::of("y", 1))
            .unwrap_err();
        assert!(matches!(err, ModelError::NoLinkModel(_, _)));
    }
}
