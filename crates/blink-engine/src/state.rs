//! Blink state machine
//!
//! Two states per scan: eyes OPEN or CLOSED. A closed run of at least
//! `min_blink_frames` samples that reopens emits one blink at the run's
//! first frame. A run still closed at end of stream emits nothing.

use crate::analysis::BlinkEvent;

#[derive(Debug)]
pub struct BlinkTracker {
    ear_threshold: f32,
    min_blink_frames: u32,
    eye_closed: bool,
    closed_frames: u32,
    blink_start_frame: u64,
}

impl BlinkTracker {
    pub fn new(ear_threshold: f32, min_blink_frames: u32) -> Self {
        Self {
            ear_threshold,
            min_blink_frames,
            eye_closed: false,
            closed_frames: 0,
            blink_start_frame: 0,
        }
    }

    /// Feed one sampled frame's EAR. Returns a blink when a valid closed
    /// run just reopened.
    ///
    /// Frames with no detected face are simply not fed; the state persists
    /// across them unchanged.
    pub fn observe(&mut self, frame_number: u64, ear: f32, fps: f64) -> Option<BlinkEvent> {
        if ear < self.ear_threshold {
            if !self.eye_closed {
                self.eye_closed = true;
                self.blink_start_frame = frame_number;
            }
            self.closed_frames += 1;
            return None;
        }

        let event = if self.eye_closed && self.closed_frames >= self.min_blink_frames {
            Some(BlinkEvent {
                timestamp_seconds: self.blink_start_frame as f64 / fps,
                frame_number: self.blink_start_frame,
                ear_value: ear,
            })
        } else {
            None
        };
        self.eye_closed = false;
        self.closed_frames = 0;
        event
    }
}
