//! Violation rule engine
//!
//! Every [`ViolationKind`] maps to exactly one detector. Detectors only read
//! the scene, so they run in any order (or concurrently) and their results
//! are merged into a set. A detector that errors or panics counts as "not
//! detected" and never affects the others.

use crate::model::RuleConfig;
use crate::service::geometry::{find_nearby, motorcycles};
use crate::service::helmet::{head_region, helmet_present};
use challan_types::{Detection, ViolationKind};
use image::DynamicImage;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Read-only inputs shared by all detectors
#[derive(Debug, Clone, Copy)]
pub struct SceneContext<'a> {
    pub image: &'a DynamicImage,
    pub vehicles: &'a [Detection],
    pub persons: &'a [Detection],
    pub signs: &'a [Detection],
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    #[error("{0}")]
    Failed(String),
}

pub trait ViolationDetector: Send + Sync {
    fn detect(&self, scene: &SceneContext<'_>) -> Result<bool, DetectorError>;
}

impl<F> ViolationDetector for F
where
    F: Fn(&SceneContext<'_>) -> Result<bool, DetectorError> + Send + Sync,
{
    fn detect(&self, scene: &SceneContext<'_>) -> Result<bool, DetectorError> {
        self(scene)
    }
}

/// Rider near a motorcycle whose head region shows too little helmet colour
#[derive(Debug, Clone)]
pub struct HelmetDetector {
    pub proximity_px: f64,
    pub head_fraction: f64,
    pub coverage_threshold: f64,
}

impl ViolationDetector for HelmetDetector {
    fn detect(&self, scene: &SceneContext<'_>) -> Result<bool, DetectorError> {
        for motorcycle in motorcycles(scene.vehicles) {
            for rider in find_nearby(motorcycle, scene.persons, self.proximity_px) {
                let head = head_region(scene.image, &rider.bbox, self.head_fraction);
                if !helmet_present(&head, self.coverage_threshold) {
                    debug!("No helmet on rider at {:?}", rider.bbox.to_array());
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// More riders near one motorcycle than allowed
#[derive(Debug, Clone)]
pub struct TripleRidingDetector {
    pub proximity_px: f64,
    pub max_riders: usize,
}

impl ViolationDetector for TripleRidingDetector {
    fn detect(&self, scene: &SceneContext<'_>) -> Result<bool, DetectorError> {
        Ok(motorcycles(scene.vehicles)
            .any(|m| find_nearby(m, scene.persons, self.proximity_px).len() > self.max_riders))
    }
}

/// Extension point for a rule that needs analysis a single still photo does
/// not support yet. Always reports "not detected".
#[derive(Debug, Clone)]
pub struct Unimplemented {
    pub requires: &'static str,
}

impl ViolationDetector for Unimplemented {
    fn detect(&self, _scene: &SceneContext<'_>) -> Result<bool, DetectorError> {
        Ok(false)
    }
}

/// The built-in detector for a kind
pub fn builtin_detector(kind: ViolationKind, config: &RuleConfig) -> Box<dyn ViolationDetector> {
    match kind {
        ViolationKind::HelmetViolation => Box::new(HelmetDetector {
            proximity_px: config.helmet_proximity_px,
            head_fraction: config.head_region_fraction,
            coverage_threshold: config.helmet_coverage_threshold,
        }),
        ViolationKind::TripleRiding => Box::new(TripleRidingDetector {
            proximity_px: config.triple_riding_proximity_px,
            max_riders: config.max_riders,
        }),
        ViolationKind::WrongWay => Box::new(Unimplemented {
            requires: "lane detection and traffic-flow direction",
        }),
        ViolationKind::MobileUsage => Box::new(Unimplemented {
            requires: "driver face and hand-gesture analysis",
        }),
        ViolationKind::SeatbeltViolation => Box::new(Unimplemented {
            requires: "vehicle interior and seatbelt classification",
        }),
        ViolationKind::SignalJump => Box::new(Unimplemented {
            requires: "traffic light state and stop-line position",
        }),
        ViolationKind::Speeding => Box::new(Unimplemented {
            requires: "motion across frames or speed-limit context",
        }),
        ViolationKind::WrongParking => Box::new(Unimplemented {
            requires: "parking zone segmentation",
        }),
    }
}

pub struct ViolationEngine {
    detectors: BTreeMap<ViolationKind, Box<dyn ViolationDetector>>,
    parallel: bool,
}

impl ViolationEngine {
    pub fn new(config: &RuleConfig) -> Self {
        let detectors = ViolationKind::ALL
            .iter()
            .map(|&kind| (kind, builtin_detector(kind, config)))
            .collect();
        Self {
            detectors,
            parallel: false,
        }
    }

    /// Replace the detector registered for `kind`
    pub fn with_detector(mut self, kind: ViolationKind, detector: impl ViolationDetector + 'static) -> Self {
        self.detectors.insert(kind, Box::new(detector));
        self
    }

    /// Evaluate detectors on scoped threads instead of sequentially
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = ViolationKind> + '_ {
        self.detectors.keys().copied()
    }

    pub fn detect(
        &self,
        image: &DynamicImage,
        vehicles: &[Detection],
        persons: &[Detection],
        signs: &[Detection],
    ) -> BTreeSet<ViolationKind> {
        self.detect_scene(&SceneContext {
            image,
            vehicles,
            persons,
            signs,
        })
    }

    pub fn detect_scene(&self, scene: &SceneContext<'_>) -> BTreeSet<ViolationKind> {
        if self.parallel {
            std::thread::scope(|s| {
                let handles: Vec<_> = self
                    .detectors
                    .iter()
                    .map(|(&kind, detector)| {
                        s.spawn(move || (kind, run_isolated(kind, detector.as_ref(), scene)))
                    })
                    .collect();
                handles
                    .into_iter()
                    .filter_map(|h| h.join().ok())
                    .filter(|(_, hit)| *hit)
                    .map(|(kind, _)| kind)
                    .collect()
            })
        } else {
            self.detectors
                .iter()
                .filter_map(|(&kind, detector)| {
                    run_isolated(kind, detector.as_ref(), scene).then_some(kind)
                })
                .collect()
        }
    }
}

/// Run one detector, mapping errors and panics to "not detected"
fn run_isolated(kind: ViolationKind, detector: &dyn ViolationDetector, scene: &SceneContext<'_>) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| detector.detect(scene))) {
        Ok(Ok(hit)) => hit,
        Ok(Err(e)) => {
            warn!("Error in {} detection: {}", kind, e);
            false
        }
        Err(_) => {
            warn!("{} detector panicked; treating as not detected", kind);
            false
        }
    }
}
