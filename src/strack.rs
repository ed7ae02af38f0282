use crate::{
    kalman_filter::{KalmanFilter, StateCov, StateMean},
    object::Object,
    rect::Rect,
};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/*----------------------------------------------------------------------------
Track state enum
----------------------------------------------------------------------------*/

/// Lifecycle of a track. `Removed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackState {
    New,
    Tracked,
    Lost,
    Removed,
}

/*----------------------------------------------------------------------------
STrack struct
----------------------------------------------------------------------------*/

impl Debug for STrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "STrack {{ track_id: {}, frame_id: {}, start_frame: {}, tracklet_len: {}, state: {:?}, is_activated: {}, score: {}, class_id: {}, rect: {:?} }}",
            self.track_id, self.frame_id, self.start_frame, self.tracklet_len, self.state, self.is_activated, self.score, self.class_id, self.rect
        )
    }
}

#[derive(Clone)]
pub(crate) struct STrack {
    mean: StateMean,
    covariance: StateCov,
    rect: Rect<f32>,
    state: TrackState,
    is_activated: bool,
    score: f32,
    class_id: usize,
    track_id: usize,
    frame_id: usize,
    start_frame: usize,
    tracklet_len: usize,
}

impl STrack {
    pub(crate) fn new(rect: Rect<f32>, score: f32, class_id: usize) -> Self {
        Self {
            mean: StateMean::zeros(),
            covariance: StateCov::zeros(),
            rect,
            state: TrackState::New,
            is_activated: false,
            score,
            class_id,
            track_id: 0,
            frame_id: 0,
            start_frame: 0,
            tracklet_len: 0,
        }
    }

    pub(crate) fn from_object(object: &Object) -> Self {
        Self::new(object.get_rect(), object.get_score(), object.get_class_id())
    }

    pub(crate) fn get_rect(&self) -> &Rect<f32> {
        &self.rect
    }

    pub(crate) fn get_state(&self) -> TrackState {
        self.state
    }

    pub(crate) fn is_activated(&self) -> bool {
        self.is_activated
    }

    pub(crate) fn get_score(&self) -> f32 {
        self.score
    }

    #[cfg(test)]
    pub(crate) fn get_track_id(&self) -> usize {
        self.track_id
    }

    #[cfg(test)]
    pub(crate) fn get_frame_id(&self) -> usize {
        self.frame_id
    }

    #[cfg(test)]
    pub(crate) fn get_start_frame(&self) -> usize {
        self.start_frame
    }

    #[cfg(test)]
    pub(crate) fn get_tracklet_len(&self) -> usize {
        self.tracklet_len
    }

    /// Last frame this track was matched to a detection.
    pub(crate) fn end_frame(&self) -> usize {
        self.frame_id
    }

    /// Frames between activation and the last match.
    pub(crate) fn active_duration(&self) -> usize {
        self.frame_id.saturating_sub(self.start_frame)
    }

    /// Starts a new tracklet from this detection and assigns its identity.
    ///
    /// Only tracks born on the very first frame are confirmed right away;
    /// any later spawn stays unconfirmed until it is matched once more.
    pub(crate) fn activate(
        &mut self,
        kalman_filter: &KalmanFilter,
        frame_id: usize,
        track_id: usize,
    ) {
        kalman_filter.initiate(
            &mut self.mean,
            &mut self.covariance,
            &self.rect.get_xyah(),
        );
        self.update_rect();

        self.state = TrackState::Tracked;
        self.is_activated = frame_id == 1;
        self.track_id = track_id;
        self.frame_id = frame_id;
        self.start_frame = frame_id;
        self.tracklet_len = 1;
    }

    /// Re-acquires a lost track. The identity is kept.
    pub(crate) fn re_activate(
        &mut self,
        kalman_filter: &KalmanFilter,
        new_track: &STrack,
        frame_id: usize,
    ) {
        kalman_filter.update(
            &mut self.mean,
            &mut self.covariance,
            &new_track.get_rect().get_xyah(),
        );
        self.update_rect();

        self.state = TrackState::Tracked;
        self.is_activated = true;
        self.score = new_track.get_score();
        self.class_id = new_track.class_id;
        self.frame_id = frame_id;
        self.tracklet_len += 1;
    }

    pub(crate) fn update(
        &mut self,
        kalman_filter: &KalmanFilter,
        new_track: &STrack,
        frame_id: usize,
    ) {
        kalman_filter.update(
            &mut self.mean,
            &mut self.covariance,
            &new_track.get_rect().get_xyah(),
        );
        self.update_rect();

        self.state = TrackState::Tracked;
        self.is_activated = true;
        self.score = new_track.get_score();
        self.class_id = new_track.class_id;
        self.frame_id = frame_id;
        self.tracklet_len += 1;
    }

    pub(crate) fn predict(&mut self, kalman_filter: &KalmanFilter) {
        if self.state != TrackState::Tracked {
            self.mean[(0, 7)] = 0.;
        }
        kalman_filter.predict(&mut self.mean, &mut self.covariance);
        self.update_rect();
    }

    pub(crate) fn mark_as_lost(&mut self) {
        self.state = TrackState::Lost;
    }

    pub(crate) fn mark_as_removed(&mut self) {
        self.state = TrackState::Removed;
    }

    fn update_rect(&mut self) {
        self.rect = Rect::from_xyah(
            self.mean[(0, 0)],
            self.mean[(0, 1)],
            self.mean[(0, 2)],
            self.mean[(0, 3)],
        );
    }

    pub(crate) fn to_record(&self) -> TrackRecord {
        TrackRecord {
            track_id: self.track_id,
            tlbr: self.rect.get_tlbr(),
            state: self.state,
            is_activated: self.is_activated,
            frame_id: self.frame_id,
            tracklet_len: self.tracklet_len,
            start_frame: self.start_frame,
            score: self.score,
            class_id: self.class_id,
        }
    }
}

/*----------------------------------------------------------------------------
TrackRecord
----------------------------------------------------------------------------*/

/// Owned snapshot of a track handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub track_id: usize,
    /// `[x1, y1, x2, y2]`
    pub tlbr: [f32; 4],
    pub state: TrackState,
    pub is_activated: bool,
    pub frame_id: usize,
    pub tracklet_len: usize,
    pub start_frame: usize,
    pub score: f32,
    pub class_id: usize,
}

impl TrackRecord {
    pub fn tlwh(&self) -> [f32; 4] {
        let [x1, y1, x2, y2] = self.tlbr;
        [x1, y1, x2 - x1, y2 - y1]
    }

    pub fn area(&self) -> f32 {
        let [_, _, w, h] = self.tlwh();
        w * h
    }
}
