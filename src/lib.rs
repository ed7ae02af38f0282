//! ByteTrack multi-object tracking core.
//!
//! Feed one frame of [`Object`] detections at a time into
//! [`ByteTracker::update`] and get back [`TrackRecord`]s carrying identities
//! that stay stable across frames and short occlusions.
//!
//! ```
//! use bytetrack_core::{ByteTracker, Object};
//!
//! let mut tracker = ByteTracker::default();
//! let tracks = tracker.update(&[Object::from_tlwh(10.0, 10.0, 20.0, 20.0, 0.9, 0)]);
//! assert_eq!(tracks[0].track_id, 1);
//! ```

pub mod byte_tracker;
pub mod config;
pub mod error;
pub mod object;
pub mod rect;
pub mod strack;

mod kalman_filter;
mod lapjv;
mod matching;

pub use byte_tracker::ByteTracker;
pub use config::ByteTrackerConfig;
pub use error::TrackError;
pub use object::Object;
pub use rect::Rect;
pub use strack::{TrackRecord, TrackState};
