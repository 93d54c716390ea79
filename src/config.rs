//! TOML configuration shared by the binaries.
//!
//! ```toml
//! [node]
//! tick_hz = 0.5
//!
//! [bus]
//! bind = "127.0.0.1:14600"
//! peers = ["127.0.0.1:14601"]
//!
//! [vehicle]
//! rc_override_ms = 1000
//! throttle_pwm = 1600
//! servo_pwm = 1435
//! mission = [{ lat = 37.3317, lon = -121.8881 }]
//!
//! [perception]
//! seed = 7
//! probability = 0.5
//!
//! [states.FollowWaypoint]
//! tick_budget = 8
//! ```
//!
//! Every section and field is optional. A missing file yields the defaults.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use magellan_core::mission::{Waypoint, MAX_WAYPOINTS};
use magellan_core::{StateId, StateProfile};
use serde::Deserialize;
use tokio::fs;

use crate::bus::{UdpBusConfig, DEFAULT_CHANNEL_CAPACITY};
use crate::error::ConfigError;
use crate::node::{RcPwm, DEFAULT_SERVO_PWM, DEFAULT_THROTTLE_PWM};
use crate::vehicle::SimVehicleConfig;

/// Valid RC PWM range (microseconds)
const PWM_RANGE: std::ops::RangeInclusive<u16> = 1000..=2000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MagellanConfig {
    pub node: NodeConfig,
    pub bus: BusConfig,
    pub vehicle: VehicleConfig,
    pub perception: PerceptionConfig,
    /// Per-state overrides keyed by state name
    pub states: BTreeMap<String, StateConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Control loop rate
    pub tick_hz: f64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { tick_hz: 0.5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub bind: SocketAddr,
    pub peers: Vec<SocketAddr>,
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            peers: Vec::new(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub rc_override_ms: u64,
    pub throttle_pwm: u16,
    pub servo_pwm: u16,
    /// Mission preloaded on the simulated vehicle
    pub mission: Vec<WaypointConfig>,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            rc_override_ms: 1000,
            throttle_pwm: DEFAULT_THROTTLE_PWM,
            servo_pwm: DEFAULT_SERVO_PWM,
            mission: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WaypointConfig {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub alt: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// RNG seed; unset seeds from entropy
    pub seed: Option<u64>,
    /// Probability that a predicate holds when evaluated
    pub probability: f64,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            seed: None,
            probability: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub tick_budget: Option<u32>,
}

impl MagellanConfig {
    /// Load and validate `path`. A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = if fs::try_exists(path).await.unwrap_or(false) {
            let content = fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !(self.node.tick_hz.is_finite() && self.node.tick_hz > 0.0) {
            errors.push("node.tick_hz must be a positive number".to_string());
        }

        if self.bus.capacity == 0 {
            errors.push("bus.capacity must be greater than 0".to_string());
        }

        if self.vehicle.rc_override_ms == 0 {
            errors.push("vehicle.rc_override_ms must be greater than 0".to_string());
        } else if self.node.tick_hz > 0.0
            && self.vehicle.rc_override_ms as f64 >= 1000.0 / self.node.tick_hz
        {
            errors.push("vehicle.rc_override_ms must be shorter than one tick".to_string());
        }
        for (name, pwm) in [
            ("throttle_pwm", self.vehicle.throttle_pwm),
            ("servo_pwm", self.vehicle.servo_pwm),
        ] {
            if !PWM_RANGE.contains(&pwm) {
                errors.push(format!("vehicle.{name} must be between 1000 and 2000"));
            }
        }
        if self.vehicle.mission.len() > MAX_WAYPOINTS {
            errors.push(format!(
                "vehicle.mission holds at most {MAX_WAYPOINTS} waypoints"
            ));
        }
        for (i, wp) in self.vehicle.mission.iter().enumerate() {
            if !(-90.0..=90.0).contains(&wp.lat) || !(-180.0..=180.0).contains(&wp.lon) {
                errors.push(format!("vehicle.mission[{i}] is not a valid coordinate"));
            }
        }

        if !(0.0..=1.0).contains(&self.perception.probability) {
            errors.push("perception.probability must be between 0.0 and 1.0".to_string());
        }

        for (name, state) in &self.states {
            if StateId::from_name(name).is_none() {
                errors.push(format!("states.{name} is not a known state"));
            }
            if state.tick_budget == Some(0) {
                errors.push(format!("states.{name}.tick_budget must be greater than 0"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Control loop period.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.node.tick_hz)
    }

    /// Profile for `state` with any configured override applied.
    pub fn profile(&self, state: StateId) -> StateProfile {
        let profile = StateProfile::for_state(state);
        match self
            .states
            .get(state.name())
            .and_then(|config| config.tick_budget)
        {
            Some(ticks) => profile.with_tick_budget(ticks),
            None => profile,
        }
    }

    pub fn rc_pwm(&self) -> RcPwm {
        RcPwm {
            throttle: self.vehicle.throttle_pwm,
            servo: self.vehicle.servo_pwm,
        }
    }

    pub fn sim_vehicle(&self) -> SimVehicleConfig {
        let mission = self
            .vehicle
            .mission
            .iter()
            .enumerate()
            .map(|(seq, wp)| Waypoint::from_degrees(seq as u16, wp.lat, wp.lon, wp.alt))
            .collect();
        SimVehicleConfig {
            rc_override: Duration::from_millis(self.vehicle.rc_override_ms),
            mission,
        }
    }

    pub fn udp_bus(&self) -> UdpBusConfig {
        UdpBusConfig {
            bind: self.bus.bind,
            peers: self.bus.peers.clone(),
            capacity: self.bus.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = MagellanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_period(), Duration::from_secs(2));
        assert_eq!(config.vehicle.rc_override_ms, 1000);
        assert_eq!(config.rc_pwm(), RcPwm::default());
        assert_eq!(
            config.profile(StateId::FollowWaypoint),
            StateProfile::for_state(StateId::FollowWaypoint)
        );
    }

    #[test]
    fn test_parse_overrides() {
        let config = MagellanConfig::parse(
            r#"
            [node]
            tick_hz = 4.0

            [bus]
            bind = "127.0.0.1:14600"
            peers = ["127.0.0.1:14601", "127.0.0.1:14602"]

            [vehicle]
            rc_override_ms = 100
            mission = [{ lat = 37.0, lon = -122.0 }, { lat = 37.001, lon = -122.0, alt = 1.5 }]

            [states.DriveTowardTarget]
            tick_budget = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.tick_period(), Duration::from_millis(250));
        assert_eq!(config.udp_bus().peers.len(), 2);
        assert_eq!(config.profile(StateId::DriveTowardTarget).tick_budget, 3);
        assert_eq!(
            config.profile(StateId::AvoidObstacle).tick_budget,
            StateProfile::for_state(StateId::AvoidObstacle).tick_budget
        );

        let sim = config.sim_vehicle();
        assert_eq!(sim.rc_override, Duration::from_millis(100));
        assert_eq!(sim.mission.len(), 2);
        assert_eq!(sim.mission[1].seq, 1);
        assert_eq!(sim.mission[1].alt_m, 1.5);
    }

    #[test]
    fn test_validation_collects_every_error() {
        let err = MagellanConfig::parse(
            r#"
            [node]
            tick_hz = 0.0

            [vehicle]
            throttle_pwm = 2500

            [perception]
            probability = 1.5

            [states.Dancing]
            tick_budget = 0
            "#,
        )
        .unwrap_err();

        let errors = match err {
            ConfigError::Invalid(errors) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        };
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| e.contains("tick_hz")));
        assert!(errors.iter().any(|e| e.contains("throttle_pwm")));
        assert!(errors.iter().any(|e| e.contains("probability")));
        assert!(errors.iter().any(|e| e.contains("not a known state")));
        assert!(errors.iter().any(|e| e.contains("tick_budget")));
    }

    #[test]
    fn test_rc_override_must_fit_in_a_tick() {
        let err = MagellanConfig::parse(
            r#"
            [node]
            tick_hz = 2.0
            [vehicle]
            rc_override_ms = 500
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("shorter than one tick"));
    }

    #[test]
    fn test_parse_error() {
        let err = MagellanConfig::parse("[node]\ntick_hz = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[tokio::test]
    async fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MagellanConfig::load(&dir.path().join("magellan.toml"))
            .await
            .unwrap();
        assert_eq!(config.node.tick_hz, 0.5);
        assert!(config.states.is_empty());
    }

    #[tokio::test]
    async fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[perception]\nseed = 7\nprobability = 1.0").unwrap();

        let config = MagellanConfig::load(file.path()).await.unwrap();
        assert_eq!(config.perception.seed, Some(7));
        assert_eq!(config.perception.probability, 1.0);
    }
}
