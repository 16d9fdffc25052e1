//! Braking Detector
//!
//! Two-state machine over (speed, forward acceleration) pairs. It has no
//! cooldown of its own: the indicator follows the instantaneous condition
//! and alert rate-limiting is left to the audio engine.

use drivescope_env::{SensorError, SettingsStore, THRESHOLDS_KEY};
use serde::{Deserialize, Serialize};

/// Configurable trigger thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrakingThresholds {
    /// Braking is only flagged above this ground speed (m/s)
    pub speed_threshold_mps: f64,

    /// Forward acceleration below this value counts as braking (m/s², negative)
    pub brake_threshold_mps2: f64,
}

impl BrakingThresholds {
    /// Defaults wired into the dashboard: 0.5 m/s, -2.0 m/s².
    pub fn operational() -> Self {
        Self {
            speed_threshold_mps: 0.5,
            brake_threshold_mps2: -2.0,
        }
    }

    /// Stricter safety-alert defaults: ~5 km/h, -5.0 m/s².
    pub fn product() -> Self {
        Self {
            speed_threshold_mps: 1.4,
            brake_threshold_mps2: -5.0,
        }
    }

    /// Rejects thresholds the detector cannot meaningfully use.
    pub fn validate(&self) -> Result<(), SensorError> {
        if !self.speed_threshold_mps.is_finite() || self.speed_threshold_mps < 0.0 {
            return Err(SensorError::settings(format!(
                "speed threshold must be a non-negative number, got {}",
                self.speed_threshold_mps
            )));
        }
        if !self.brake_threshold_mps2.is_finite() || self.brake_threshold_mps2 >= 0.0 {
            return Err(SensorError::settings(format!(
                "brake threshold must be negative, got {}",
                self.brake_threshold_mps2
            )));
        }
        Ok(())
    }

    /// Reads thresholds from a settings store.
    ///
    /// # Returns
    /// * `Ok(None)` - Nothing stored yet
    /// * `Err(SensorError::Settings)` - Stored value is malformed or invalid
    pub fn load_from(store: &dyn SettingsStore) -> Result<Option<Self>, SensorError> {
        let Some(raw) = store.load(THRESHOLDS_KEY)? else {
            return Ok(None);
        };
        let thresholds: Self = serde_json::from_str(&raw).map_err(SensorError::settings)?;
        thresholds.validate()?;
        Ok(Some(thresholds))
    }

    /// Writes thresholds to a settings store.
    pub fn save_to(&self, store: &mut dyn SettingsStore) -> Result<(), SensorError> {
        self.validate()?;
        let raw = serde_json::to_string(self).map_err(SensorError::settings)?;
        store.store(THRESHOLDS_KEY, &raw)
    }
}

impl Default for BrakingThresholds {
    fn default() -> Self {
        Self::operational()
    }
}

/// Named threshold sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdPreset {
    /// 0.5 m/s, -2.0 m/s²
    Operational,

    /// 1.4 m/s, -5.0 m/s²
    Product,
}

impl ThresholdPreset {
    pub fn name(&self) -> &'static str {
        match self {
            ThresholdPreset::Operational => "operational",
            ThresholdPreset::Product => "product",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ThresholdPreset::Operational => "Sensitive: >0.5 m/s and < -2.0 m/s²",
            ThresholdPreset::Product => "Hard braking only: >1.4 m/s and < -5.0 m/s²",
        }
    }

    pub fn thresholds(&self) -> BrakingThresholds {
        match self {
            ThresholdPreset::Operational => BrakingThresholds::operational(),
            ThresholdPreset::Product => BrakingThresholds::product(),
        }
    }
}

impl std::fmt::Display for ThresholdPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ThresholdPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "operational" | "default" => Ok(ThresholdPreset::Operational),
            "product" | "strict" => Ok(ThresholdPreset::Product),
            _ => Err(format!("Unknown threshold preset: {}", s)),
        }
    }
}

/// Detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BrakingState {
    Normal,
    Braking,
}

/// What an update did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrakingTransition {
    /// NORMAL -> BRAKING: show indicator, request alert
    Entered,
    /// BRAKING -> NORMAL: hide indicator
    Exited,
    Unchanged,
}

/// Read-only view for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BrakingAlertState {
    pub is_braking: bool,
    pub last_alert_fired_at_ms: Option<u64>,
}

/// Owns the braking state; nothing else mutates it.
#[derive(Debug, Clone)]
pub struct BrakingDetector {
    thresholds: BrakingThresholds,
    state: BrakingState,
    last_alert_fired_at_ms: Option<u64>,
    episodes: u64,
}

impl BrakingDetector {
    pub fn new(thresholds: BrakingThresholds) -> Self {
        Self {
            thresholds,
            state: BrakingState::Normal,
            last_alert_fired_at_ms: None,
            episodes: 0,
        }
    }

    /// Feeds one (speed, forward acceleration) pair.
    pub fn update(&mut self, speed_mps: f64, forward_acceleration: f64) -> BrakingTransition {
        let condition = speed_mps > self.thresholds.speed_threshold_mps
            && forward_acceleration < self.thresholds.brake_threshold_mps2;

        match (self.state, condition) {
            (BrakingState::Normal, true) => {
                self.state = BrakingState::Braking;
                self.episodes += 1;
                tracing::debug!(speed_mps, forward_acceleration, "braking detected");
                BrakingTransition::Entered
            }
            (BrakingState::Braking, false) => {
                self.state = BrakingState::Normal;
                tracing::debug!(speed_mps, forward_acceleration, "braking ended");
                BrakingTransition::Exited
            }
            _ => BrakingTransition::Unchanged,
        }
    }

    /// Replaces the thresholds; takes effect on the next update.
    pub fn set_thresholds(&mut self, thresholds: BrakingThresholds) {
        self.thresholds = thresholds;
    }

    pub fn thresholds(&self) -> BrakingThresholds {
        self.thresholds
    }

    pub fn state(&self) -> BrakingState {
        self.state
    }

    pub fn is_braking(&self) -> bool {
        self.state == BrakingState::Braking
    }

    /// Records that an alert actually sounded.
    pub fn record_alert(&mut self, at_ms: u64) {
        self.last_alert_fired_at_ms = Some(at_ms);
    }

    /// Number of NORMAL -> BRAKING transitions so far.
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn alert_state(&self) -> BrakingAlertState {
        BrakingAlertState {
            is_braking: self.is_braking(),
            last_alert_fired_at_ms: self.last_alert_fired_at_ms,
        }
    }
}

impl Default for BrakingDetector {
    fn default() -> Self {
        Self::new(BrakingThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivescope_env::MemorySettingsStore;

    #[test]
    fn test_enter_and_exit_braking() {
        let mut detector = BrakingDetector::new(BrakingThresholds::operational());

        assert_eq!(detector.update(5.0, -3.0), BrakingTransition::Entered);
        assert!(detector.is_braking());
        assert_eq!(detector.update(5.0, -3.5), BrakingTransition::Unchanged);
        assert_eq!(detector.update(5.0, 0.0), BrakingTransition::Exited);
        assert_eq!(detector.state(), BrakingState::Normal);
        assert_eq!(detector.episodes(), 1);
    }

    #[test]
    fn test_slow_speed_never_brakes() {
        let mut detector = BrakingDetector::default();
        assert_eq!(detector.update(0.4, -9.0), BrakingTransition::Unchanged);
        assert!(!detector.is_braking());
    }

    #[test]
    fn test_thresholds_are_strict_inequalities() {
        let mut detector = BrakingDetector::default();
        assert_eq!(detector.update(0.5, -3.0), BrakingTransition::Unchanged);
        assert_eq!(detector.update(5.0, -2.0), BrakingTransition::Unchanged);
    }

    #[test]
    fn test_speed_dropping_below_threshold_exits() {
        let mut detector = BrakingDetector::default();
        detector.update(3.0, -4.0);
        assert_eq!(detector.update(0.2, -4.0), BrakingTransition::Exited);
    }

    #[test]
    fn test_flapping_counts_each_episode() {
        let mut detector = BrakingDetector::default();
        for _ in 0..3 {
            assert_eq!(detector.update(5.0, -3.0), BrakingTransition::Entered);
            assert_eq!(detector.update(5.0, 0.0), BrakingTransition::Exited);
        }
        assert_eq!(detector.episodes(), 3);
    }

    #[test]
    fn test_product_preset_ignores_moderate_braking() {
        let mut detector = BrakingDetector::new(ThresholdPreset::Product.thresholds());
        assert_eq!(detector.update(5.0, -3.0), BrakingTransition::Unchanged);
        assert_eq!(detector.update(5.0, -6.0), BrakingTransition::Entered);

        detector.set_thresholds(BrakingThresholds::operational());
        assert_eq!(detector.update(5.0, -3.0), BrakingTransition::Unchanged);
        assert!(detector.is_braking());
    }

    #[test]
    fn test_alert_state_snapshot() {
        let mut detector = BrakingDetector::default();
        detector.update(5.0, -3.0);
        detector.record_alert(1_234);

        let view = detector.alert_state();
        assert!(view.is_braking);
        assert_eq!(view.last_alert_fired_at_ms, Some(1_234));
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let positive_brake = BrakingThresholds {
            speed_threshold_mps: 1.0,
            brake_threshold_mps2: 1.0,
        };
        let negative_speed = BrakingThresholds {
            speed_threshold_mps: -1.0,
            brake_threshold_mps2: -2.0,
        };
        assert!(positive_brake.validate().is_err());
        assert!(negative_speed.validate().is_err());
        assert!(BrakingThresholds::product().validate().is_ok());
    }

    #[test]
    fn test_settings_store_roundtrip() {
        let mut store = MemorySettingsStore::new();
        assert_eq!(BrakingThresholds::load_from(&store).unwrap(), None);

        BrakingThresholds::product().save_to(&mut store).unwrap();
        assert_eq!(
            BrakingThresholds::load_from(&store).unwrap(),
            Some(BrakingThresholds::product())
        );
    }

    #[test]
    fn test_malformed_stored_settings() {
        let mut store = MemorySettingsStore::new();
        store.store(THRESHOLDS_KEY, "not json").unwrap();
        assert!(matches!(
            BrakingThresholds::load_from(&store),
            Err(SensorError::Settings(_))
        ));
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("product".parse::<ThresholdPreset>(), Ok(ThresholdPreset::Product));
        assert_eq!("Operational".parse::<ThresholdPreset>(), Ok(ThresholdPreset::Operational));
        assert!("lenient".parse::<ThresholdPreset>().is_err());
    }
}
