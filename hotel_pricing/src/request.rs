//! Booking inquiries

use serde::Serialize;

/// Calendar placement of a request, fixed once it is filled against a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stay {
    pub booking_day: usize,
    pub start_day: usize,
    /// Inclusive: the room is held on `end_day` too
    pub end_day: usize,
    pub cancellation_day: Option<usize>,
}

/// One booking inquiry
///
/// Generated unfilled (lead time, stay length, party size, cancellation
/// offset); `fill` places it on the calendar relative to the day it arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub los: usize,
    pub persons: usize,
    pub depth: usize,
    /// Days before arrival on which the booking cancels
    pub cancellation_offset: Option<usize>,
    stay: Option<Stay>,
}

impl Request {
    pub fn new(
        los: usize,
        persons: usize,
        depth: usize,
        cancellation_offset: Option<usize>,
    ) -> Self {
        Request {
            los,
            persons,
            depth,
            cancellation_offset,
            stay: None,
        }
    }

    /// Place the request on the calendar for an inquiry arriving on `day`
    ///
    /// # Panics
    ///
    /// If the request was already filled, or the cancellation offset reaches
    /// back before `day`.
    pub fn fill(&mut self, day: usize) {
        assert!(self.stay.is_none(), "request filled twice");
        let start_day = day + self.depth;
        let cancellation_day = self.cancellation_offset.map(|offset| {
            assert!(
                offset <= self.depth,
                "cancellation offset {offset} exceeds depth {}",
                self.depth
            );
            start_day - offset
        });
        self.stay = Some(Stay {
            booking_day: day,
            start_day,
            end_day: start_day + self.los,
            cancellation_day,
        });
    }

    /// Builder-style `fill`
    pub fn filled(mut self, day: usize) -> Self {
        self.fill(day);
        self
    }

    pub fn stay(&self) -> Option<&Stay> {
        self.stay.as_ref()
    }

    fn placed(&self) -> &Stay {
        self.stay
            .as_ref()
            .expect("request used before being filled against a day")
    }

    pub fn start_day(&self) -> usize {
        self.placed().start_day
    }

    pub fn end_day(&self) -> usize {
        self.placed().end_day
    }

    pub fn booking_day(&self) -> usize {
        self.placed().booking_day
    }

    pub fn cancellation_day(&self) -> Option<usize> {
        self.placed().cancellation_day
    }
}
