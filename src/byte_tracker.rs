use crate::{
    config::ByteTrackerConfig,
    error::TrackError,
    kalman_filter::KalmanFilter,
    matching::{iou_distance, linear_assignment},
    object::Object,
    rect::Rect,
    strack::{STrack, TrackRecord, TrackState},
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/*-----------------------------------------------------------------------------
Stage outcome
-----------------------------------------------------------------------------*/

/// What one matching stage hands to the next. Track entries are track ids,
/// detection entries are indices into the detections the stage was given.
#[derive(Debug, Default)]
struct StageOutcome {
    activated: Vec<usize>,
    refound: Vec<usize>,
    unmatched_tracks: Vec<usize>,
    unmatched_detections: Vec<usize>,
}

/*-----------------------------------------------------------------------------
ByteTracker
-----------------------------------------------------------------------------*/

/// Multi-object tracker associating per-frame detections into persistent
/// identities.
///
/// Every track lives in a single arena keyed by its id. The tracked, lost
/// and removed pools are ordered lists of ids into that arena, so a track
/// can sit in several pools while a frame is being reconciled.
///
/// One tracker serves one video stream; run one instance per stream.
#[derive(Debug)]
pub struct ByteTracker {
    config: ByteTrackerConfig,
    max_time_lost: usize,
    kalman_filter: KalmanFilter,

    frame_id: usize,
    track_id_count: usize,

    tracks: HashMap<usize, STrack>,
    tracked_stracks: Vec<usize>,
    lost_stracks: Vec<usize>,
    removed_stracks: Vec<usize>,
}

impl Default for ByteTracker {
    fn default() -> Self {
        Self::from_valid_config(ByteTrackerConfig::default())
    }
}

impl ByteTracker {
    /// Creates a tracker after validating `config`.
    ///
    /// # Example
    /// ```
    /// use bytetrack_core::{ByteTracker, ByteTrackerConfig};
    /// let tracker = ByteTracker::new(ByteTrackerConfig::default()).unwrap();
    /// assert_eq!(tracker.max_time_lost(), 30);
    /// ```
    pub fn new(config: ByteTrackerConfig) -> Result<Self, TrackError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: ByteTrackerConfig) -> Self {
        let max_time_lost = config.max_time_lost();
        Self {
            config,
            max_time_lost,
            kalman_filter: KalmanFilter::default(),

            frame_id: 0,
            track_id_count: 0,

            tracks: HashMap::new(),
            tracked_stracks: Vec::new(),
            lost_stracks: Vec::new(),
            removed_stracks: Vec::new(),
        }
    }

    pub fn config(&self) -> &ByteTrackerConfig {
        &self.config
    }

    /// Number of frames processed since construction or the last reset.
    pub fn frame_id(&self) -> usize {
        self.frame_id
    }

    pub fn max_time_lost(&self) -> usize {
        self.max_time_lost
    }

    /// Snapshot of the tracked pool, unconfirmed tracks included.
    pub fn tracked_tracks(&self) -> Vec<TrackRecord> {
        self.records(&self.tracked_stracks)
    }

    pub fn lost_tracks(&self) -> Vec<TrackRecord> {
        self.records(&self.lost_stracks)
    }

    /// Tracks removed during the latest frame.
    pub fn removed_tracks(&self) -> Vec<TrackRecord> {
        self.records(&self.removed_stracks)
    }

    /// Drops every track and restarts frame and id counting.
    pub fn reset(&mut self) {
        self.frame_id = 0;
        self.track_id_count = 0;
        self.tracks.clear();
        self.tracked_stracks.clear();
        self.lost_stracks.clear();
        self.removed_stracks.clear();
        debug!("tracker reset");
    }

    /// Feeds one frame of detections and returns the confirmed tracks whose
    /// box area exceeds `min_box_area`, in tracked-pool order.
    pub fn update(&mut self, objects: &[Object]) -> Vec<TrackRecord> {
        self.frame_id += 1;

        // removals are only reported for the frame they happened in
        for id in std::mem::take(&mut self.removed_stracks) {
            self.tracks.remove(&id);
        }

        ////////////////// Step 1: Split detections by score //////////////////
        let (det_high, det_low): (Vec<STrack>, Vec<STrack>) = objects
            .iter()
            .map(STrack::from_object)
            .partition(|det| det.get_score() >= self.config.track_thresh);

        ////////////////// Step 2: Partition the tracked pool //////////////////
        let (confirmed, unconfirmed): (Vec<usize>, Vec<usize>) = self
            .tracked_stracks
            .iter()
            .partition(|id| self.tracks[*id].is_activated());

        ////////////////// Step 3: Predict the candidate pool //////////////////
        let strack_pool = joint_stracks(&confirmed, &self.lost_stracks);
        for id in &strack_pool {
            if let Some(track) = self.tracks.get_mut(id) {
                track.predict(&self.kalman_filter);
            }
        }

        ////////////////// Step 4: High-score association //////////////////
        let first =
            self.match_stage(&strack_pool, &det_high, self.config.match_thresh);

        ////////////////// Step 5: Low-score rescue //////////////////
        let r_tracked: Vec<usize> = first
            .unmatched_tracks
            .iter()
            .copied()
            .filter(|id| self.tracks[id].get_state() == TrackState::Tracked)
            .collect();
        let second =
            self.match_stage(&r_tracked, &det_low, self.config.low_match_thresh);

        let mut lost = Vec::new();
        for &id in &second.unmatched_tracks {
            if let Some(track) = self.tracks.get_mut(&id) {
                if track.get_state() != TrackState::Lost {
                    track.mark_as_lost();
                    lost.push(id);
                    trace!(track_id = id, "track lost");
                }
            }
        }

        ////////////////// Step 6: Unconfirmed reconciliation //////////////////
        let remain_high: Vec<STrack> = first
            .unmatched_detections
            .iter()
            .map(|&idet| det_high[idet].clone())
            .collect();
        let third = self.match_stage(
            &unconfirmed,
            &remain_high,
            self.config.unconfirmed_match_thresh,
        );

        let mut removed = Vec::new();
        for &id in &third.unmatched_tracks {
            if let Some(track) = self.tracks.get_mut(&id) {
                track.mark_as_removed();
                removed.push(id);
                trace!(track_id = id, "unconfirmed track removed");
            }
        }

        ////////////////// Step 7: Spawn new tracks //////////////////
        let mut activated: Vec<usize> = first
            .activated
            .iter()
            .chain(&second.activated)
            .chain(&third.activated)
            .copied()
            .collect();
        let refound: Vec<usize> = first
            .refound
            .iter()
            .chain(&second.refound)
            .chain(&third.refound)
            .copied()
            .collect();

        for &idet in &third.unmatched_detections {
            let mut track = remain_high[idet].clone();
            if track.get_score() < self.config.track_thresh {
                continue;
            }
            self.track_id_count += 1;
            let track_id = self.track_id_count;
            track.activate(&self.kalman_filter, self.frame_id, track_id);
            self.tracks.insert(track_id, track);
            activated.push(track_id);
            trace!(track_id, frame_id = self.frame_id, "track spawned");
        }

        ////////////////// Step 8: Expire lost tracks //////////////////
        for &id in &self.lost_stracks {
            let Some(track) = self.tracks.get_mut(&id) else {
                continue;
            };
            if track.get_state() == TrackState::Lost
                && self.frame_id - track.end_frame() > self.max_time_lost
            {
                track.mark_as_removed();
                removed.push(id);
                trace!(track_id = id, "lost track expired");
            }
        }

        ////////////////// Step 9: Rebuild the pools //////////////////
        let still_tracked: Vec<usize> = self
            .tracked_stracks
            .iter()
            .copied()
            .filter(|id| self.tracks[id].get_state() == TrackState::Tracked)
            .collect();
        let tracked = joint_stracks(&still_tracked, &activated);
        let tracked = joint_stracks(&tracked, &refound);

        let mut lost_pool = sub_stracks(&self.lost_stracks, &tracked);
        lost_pool.extend(lost);
        let lost_pool = sub_stracks(&lost_pool, &removed);

        ////////////////// Step 10: Cross-pool deduplication //////////////////
        let (tracked, lost_pool, duplicates) =
            self.remove_duplicate_stracks(&tracked, &lost_pool);
        for &id in &duplicates {
            if let Some(track) = self.tracks.get_mut(&id) {
                track.mark_as_removed();
                trace!(track_id = id, "duplicate track removed");
            }
        }
        removed.extend(duplicates);

        self.tracked_stracks = tracked;
        self.lost_stracks = lost_pool;
        self.removed_stracks = removed;

        ////////////////// Step 11: Emit output //////////////////
        let output: Vec<TrackRecord> = self
            .tracked_stracks
            .iter()
            .map(|id| &self.tracks[id])
            .filter(|track| {
                track.is_activated()
                    && track.get_rect().area() > self.config.min_box_area
            })
            .map(STrack::to_record)
            .collect();

        debug!(
            frame_id = self.frame_id,
            detections = objects.len(),
            tracked = self.tracked_stracks.len(),
            lost = self.lost_stracks.len(),
            removed = self.removed_stracks.len(),
            emitted = output.len(),
            "frame updated"
        );

        output
    }

    /// Matches `track_ids` against `detections` by IoU distance gated at
    /// `thresh`, updating or re-activating every matched track.
    fn match_stage(
        &mut self,
        track_ids: &[usize],
        detections: &[STrack],
        thresh: f32,
    ) -> StageOutcome {
        let track_rects: Vec<Rect<f32>> = track_ids
            .iter()
            .map(|id| self.tracks[id].get_rect().clone())
            .collect();
        let det_rects: Vec<Rect<f32>> = detections
            .iter()
            .map(|det| det.get_rect().clone())
            .collect();

        let dists = iou_distance(&track_rects, &det_rects);
        let assignment = linear_assignment(&dists, thresh);

        let mut outcome = StageOutcome {
            unmatched_tracks: assignment
                .unmatched_a
                .iter()
                .map(|&itrack| track_ids[itrack])
                .collect(),
            unmatched_detections: assignment.unmatched_b,
            ..Default::default()
        };

        for &(itrack, idet) in &assignment.matches {
            let id = track_ids[itrack];
            let Some(track) = self.tracks.get_mut(&id) else {
                continue;
            };
            let det = &detections[idet];
            if track.get_state() == TrackState::Tracked {
                track.update(&self.kalman_filter, det, self.frame_id);
                outcome.activated.push(id);
            } else {
                track.re_activate(&self.kalman_filter, det, self.frame_id);
                outcome.refound.push(id);
                trace!(track_id = id, "lost track re-activated");
            }
        }

        outcome
    }

    /// Splits overlapping tracked/lost pairs, keeping the longer-lived track.
    ///
    /// Returns the filtered `a` and `b` pools and the ids dropped from them.
    fn remove_duplicate_stracks(
        &self,
        a_ids: &[usize],
        b_ids: &[usize],
    ) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
        let a_rects: Vec<Rect<f32>> = a_ids
            .iter()
            .map(|id| self.tracks[id].get_rect().clone())
            .collect();
        let b_rects: Vec<Rect<f32>> = b_ids
            .iter()
            .map(|id| self.tracks[id].get_rect().clone())
            .collect();
        let dists = iou_distance(&a_rects, &b_rects);

        let mut dup_a = HashSet::new();
        let mut dup_b = HashSet::new();
        for ia in 0..dists.nrows() {
            for ib in 0..dists.ncols() {
                if dists[(ia, ib)] >= self.config.duplicate_thresh {
                    continue;
                }
                let time_p = self.tracks[&a_ids[ia]].active_duration();
                let time_q = self.tracks[&b_ids[ib]].active_duration();
                if time_p > time_q {
                    dup_b.insert(ib);
                } else {
                    dup_a.insert(ia);
                }
            }
        }

        let mut duplicates = Vec::new();
        let mut keep_a = Vec::with_capacity(a_ids.len());
        for (i, &id) in a_ids.iter().enumerate() {
            if dup_a.contains(&i) {
                duplicates.push(id);
            } else {
                keep_a.push(id);
            }
        }
        let mut keep_b = Vec::with_capacity(b_ids.len());
        for (i, &id) in b_ids.iter().enumerate() {
            if dup_b.contains(&i) {
                duplicates.push(id);
            } else {
                keep_b.push(id);
            }
        }

        (keep_a, keep_b, duplicates)
    }

    fn records(&self, ids: &[usize]) -> Vec<TrackRecord> {
        ids.iter()
            .filter_map(|id| self.tracks.get(id))
            .map(STrack::to_record)
            .collect()
    }
}

/*-----------------------------------------------------------------------------
Pool helpers
-----------------------------------------------------------------------------*/

/// `a` followed by the members of `b` not already present, first seen wins.
pub(crate) fn joint_stracks(a_ids: &[usize], b_ids: &[usize]) -> Vec<usize> {
    let mut exists = HashSet::new();
    let mut res = Vec::with_capacity(a_ids.len() + b_ids.len());
    for &id in a_ids.iter().chain(b_ids) {
        if exists.insert(id) {
            res.push(id);
        }
    }
    res
}

/// Members of `a` not present in `b`, in `a`'s order.
pub(crate) fn sub_stracks(a_ids: &[usize], b_ids: &[usize]) -> Vec<usize> {
    let exclude: HashSet<usize> = b_ids.iter().copied().collect();
    a_ids
        .iter()
        .copied()
        .filter(|id| !exclude.contains(id))
        .collect()
}
