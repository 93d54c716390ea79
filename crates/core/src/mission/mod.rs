//! Mission Waypoint Storage
//!
//! Fixed-capacity waypoint list mirrored from the flight controller.
//!
//! # Mission Storage
//!
//! - Fixed-size waypoint array (max 50 waypoints)
//! - Current waypoint index, validated against the stored count
//! - Scaled integer coordinates (degrees * 1e7), as the flight controller
//!   reports them
//!
//! # Note
//!
//! The storage is plain data. The simulated vehicle wraps it behind its own
//! lock; states only ever see the counts returned by pull/push.

use core::fmt;

use heapless::Vec;

/// Maximum number of waypoints in a mission
pub const MAX_WAYPOINTS: usize = 50;

/// Mission waypoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    /// Sequence number (0-indexed)
    pub seq: u16,
    /// Latitude in degrees * 1e7
    pub lat_e7: i32,
    /// Longitude in degrees * 1e7
    pub lon_e7: i32,
    /// Altitude in meters (relative to home)
    pub alt_m: f32,
}

impl Waypoint {
    /// Create a waypoint from degrees
    pub fn from_degrees(seq: u16, lat_deg: f64, lon_deg: f64, alt_m: f32) -> Self {
        Self {
            seq,
            lat_e7: (lat_deg * 1e7) as i32,
            lon_e7: (lon_deg * 1e7) as i32,
            alt_m,
        }
    }
}

/// Mission storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionError {
    /// Mission already holds [`MAX_WAYPOINTS`] waypoints
    Full,
    /// Sequence number outside the stored mission
    IndexOutOfBounds {
        /// Requested sequence number
        seq: u16,
        /// Number of stored waypoints
        count: u16,
    },
}

impl fmt::Display for MissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionError::Full => write!(f, "Mission full (max {} waypoints)", MAX_WAYPOINTS),
            MissionError::IndexOutOfBounds { seq, count } => {
                write!(f, "Waypoint {} out of bounds ({} stored)", seq, count)
            }
        }
    }
}

impl core::error::Error for MissionError {}

/// Mission storage
#[derive(Debug, Clone, Default)]
pub struct MissionStorage {
    waypoints: Vec<Waypoint, MAX_WAYPOINTS>,
    current_index: u16,
}

impl MissionStorage {
    /// Create empty storage
    pub const fn new() -> Self {
        Self {
            waypoints: Vec::new(),
            current_index: 0,
        }
    }

    /// Number of stored waypoints
    pub fn count(&self) -> u16 {
        self.waypoints.len() as u16
    }

    /// Remove all waypoints and reset the current index
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.current_index = 0;
    }

    /// Append a waypoint
    pub fn add_waypoint(&mut self, waypoint: Waypoint) -> Result<(), MissionError> {
        self.waypoints
            .push(waypoint)
            .map_err(|_| MissionError::Full)
    }

    /// Replace the whole mission
    ///
    /// On `Full` the storage keeps the waypoints that fit; callers treat the
    /// upload as failed.
    pub fn replace(&mut self, waypoints: &[Waypoint]) -> Result<u16, MissionError> {
        self.clear();
        for wp in waypoints {
            self.add_waypoint(*wp)?;
        }
        Ok(self.count())
    }

    /// Current waypoint index
    pub fn current_index(&self) -> u16 {
        self.current_index
    }

    /// Set the current waypoint index
    pub fn set_current_index(&mut self, seq: u16) -> Result<(), MissionError> {
        if (seq as usize) < self.waypoints.len() {
            self.current_index = seq;
            Ok(())
        } else {
            Err(MissionError::IndexOutOfBounds {
                seq,
                count: self.count(),
            })
        }
    }
}
