use crate::error::TrackError;
use serde::{Deserialize, Serialize};

/*-----------------------------------------------------------------------------
ByteTrackerConfig
-----------------------------------------------------------------------------*/

/// Construction-time parameters of a [`ByteTracker`](crate::ByteTracker).
///
/// Missing fields fall back to their defaults when deserialized, so a config
/// file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ByteTrackerConfig {
    /// Detections at or above this score are "high"; the rest are "low".
    pub track_thresh: f32,
    /// IoU-distance gate of the high-score stage.
    pub match_thresh: f32,
    /// IoU-distance gate of the low-score rescue stage.
    pub low_match_thresh: f32,
    /// IoU-distance gate for unconfirmed tracks.
    pub unconfirmed_match_thresh: f32,
    /// Tracked/lost pairs closer than this are duplicates.
    pub duplicate_thresh: f32,
    /// Frames of tolerated occlusion at 30 fps.
    pub track_buffer: usize,
    pub frame_rate: usize,
    /// Tracks whose box area does not exceed this are not emitted.
    pub min_box_area: f32,
}

impl Default for ByteTrackerConfig {
    fn default() -> Self {
        Self {
            track_thresh: 0.5,
            match_thresh: 0.8,
            low_match_thresh: 0.5,
            unconfirmed_match_thresh: 0.7,
            duplicate_thresh: 0.15,
            track_buffer: 30,
            frame_rate: 30,
            min_box_area: 10.0,
        }
    }
}

impl ByteTrackerConfig {
    pub fn with_track_thresh(self, track_thresh: f32) -> Self {
        Self {
            track_thresh,
            ..self
        }
    }

    pub fn with_match_thresh(self, match_thresh: f32) -> Self {
        Self {
            match_thresh,
            ..self
        }
    }

    pub fn with_track_buffer(self, track_buffer: usize) -> Self {
        Self {
            track_buffer,
            ..self
        }
    }

    pub fn with_frame_rate(self, frame_rate: usize) -> Self {
        Self { frame_rate, ..self }
    }

    pub fn with_min_box_area(self, min_box_area: f32) -> Self {
        Self {
            min_box_area,
            ..self
        }
    }

    /// Number of frames a lost track survives, scaled by the frame rate.
    pub fn max_time_lost(&self) -> usize {
        (self.frame_rate as f32 / 30.0 * self.track_buffer as f32) as usize
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        let thresholds = [
            ("track_thresh", self.track_thresh),
            ("match_thresh", self.match_thresh),
            ("low_match_thresh", self.low_match_thresh),
            ("unconfirmed_match_thresh", self.unconfirmed_match_thresh),
            ("duplicate_thresh", self.duplicate_thresh),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackError::InvalidConfig(format!(
                    "{} must be within [0, 1], but got {}",
                    name, value
                )));
            }
        }

        if self.frame_rate == 0 {
            return Err(TrackError::InvalidConfig(
                "frame_rate must be positive".to_string(),
            ));
        }

        if !self.min_box_area.is_finite() || self.min_box_area < 0.0 {
            return Err(TrackError::InvalidConfig(format!(
                "min_box_area must be a non-negative finite number, but got {}",
                self.min_box_area
            )));
        }

        Ok(())
    }
}
