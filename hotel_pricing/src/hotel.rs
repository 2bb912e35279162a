//! Hotel state: occupancy grid, booking ledger and cancellation schedule
//!
//! The grid has one row per room and one column per simulated day. Stays that
//! run past the horizon are clipped to it; their revenue is still recognised
//! in full on the arrival day.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::request::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BookingId(pub u64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub price_per_person: f64,
    pub request: Request,
}

impl Booking {
    pub fn revenue(&self) -> f64 {
        self.price_per_person * self.request.persons as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledCancellation {
    id: BookingId,
    rooms: Vec<usize>,
    start_day: usize,
    end_day: usize,
}

pub struct Hotel {
    number_of_rooms: usize,
    number_of_days: usize,
    /// Row-major `rooms × days`, `None` is vacant
    state: Vec<Option<BookingId>>,
    /// arrival day -> booking id -> booking
    bookings: BTreeMap<usize, BTreeMap<BookingId, Booking>>,
    /// cancellation day -> bookings to reverse
    cancel_days: HashMap<usize, Vec<ScheduledCancellation>>,
}

impl Hotel {
    pub fn new(number_of_rooms: usize, number_of_days: usize) -> Self {
        Hotel {
            number_of_rooms,
            number_of_days,
            state: vec![None; number_of_rooms * number_of_days],
            bookings: BTreeMap::new(),
            cancel_days: HashMap::new(),
        }
    }

    pub fn number_of_rooms(&self) -> usize {
        self.number_of_rooms
    }

    pub fn number_of_days(&self) -> usize {
        self.number_of_days
    }

    /// Occupant of `room` on `day`, `None` if vacant or outside the grid
    pub fn occupant(&self, room: usize, day: usize) -> Option<BookingId> {
        if room >= self.number_of_rooms || day >= self.number_of_days {
            return None;
        }
        self.state[room * self.number_of_days + day]
    }

    /// Inclusive day range clipped to the horizon
    fn nights(&self, start_day: usize, end_day: usize) -> Range<usize> {
        let start = start_day.min(self.number_of_days);
        let end = end_day.saturating_add(1).min(self.number_of_days);
        start..end.max(start)
    }

    fn row(&self, room: usize, nights: Range<usize>) -> &[Option<BookingId>] {
        let base = room * self.number_of_days;
        &self.state[base + nights.start..base + nights.end]
    }

    fn row_mut(&mut self, room: usize, nights: Range<usize>) -> &mut [Option<BookingId>] {
        let base = room * self.number_of_days;
        &mut self.state[base + nights.start..base + nights.end]
    }

    /// Rooms free for the whole stay, or nothing if fewer than `persons` are
    pub fn is_vacant(&self, request: &Request) -> Vec<usize> {
        let nights = self.nights(request.start_day(), request.end_day());
        let rooms: Vec<usize> = (0..self.number_of_rooms)
            .filter(|&room| self.row(room, nights.clone()).iter().all(Option::is_none))
            .collect();
        if rooms.len() >= request.persons {
            rooms
        } else {
            Vec::new()
        }
    }

    /// Hold the first `persons` of `rooms` for the stay and record the booking
    ///
    /// # Panics
    ///
    /// If fewer than `persons` rooms are offered or one of them is already
    /// taken: a double booking would corrupt the grid.
    pub fn booking(&mut self, request: &Request, rooms: &[usize], id: BookingId, price: f64) {
        assert!(
            rooms.len() >= request.persons,
            "booking {id} needs {} rooms, got {}",
            request.persons,
            rooms.len()
        );
        let assigned = rooms[..request.persons].to_vec();
        let nights = self.nights(request.start_day(), request.end_day());

        for &room in &assigned {
            let row = self.row_mut(room, nights.clone());
            assert!(
                row.iter().all(Option::is_none),
                "booking {id} overlaps an existing stay in room {room}"
            );
            row.fill(Some(id));
        }

        if let Some(cancellation_day) = request.cancellation_day() {
            self.cancel_days
                .entry(cancellation_day)
                .or_default()
                .push(ScheduledCancellation {
                    id,
                    rooms: assigned,
                    start_day: request.start_day(),
                    end_day: request.end_day(),
                });
        }

        self.bookings.entry(request.start_day()).or_default().insert(
            id,
            Booking {
                price_per_person: price,
                request: request.clone(),
            },
        );
    }

    /// Reverse every cancellation scheduled for `day`, returning how many there were
    pub fn cancel_request(&mut self, day: usize) -> usize {
        let Some(cancellations) = self.cancel_days.remove(&day) else {
            return 0;
        };
        let count = cancellations.len();
        for cancellation in cancellations {
            let nights = self.nights(cancellation.start_day, cancellation.end_day);
            for &room in &cancellation.rooms {
                for cell in self.row_mut(room, nights.clone()) {
                    if *cell == Some(cancellation.id) {
                        *cell = None;
                    }
                }
            }
            let removed = self
                .bookings
                .get_mut(&cancellation.start_day)
                .and_then(|day_bookings| day_bookings.remove(&cancellation.id));
            assert!(
                removed.is_some(),
                "cancellation of {} found no ledger entry",
                cancellation.id
            );
        }
        count
    }

    /// Rooms occupied on `day`, zero beyond the horizon
    pub fn get_loading(&self, day: usize) -> usize {
        if day >= self.number_of_days {
            return 0;
        }
        (0..self.number_of_rooms)
            .filter(|&room| self.state[room * self.number_of_days + day].is_some())
            .count()
    }

    /// Full-stay revenue of every booking still on the ledger for arrival `day`
    pub fn get_revenue(&self, day: usize) -> f64 {
        self.bookings
            .get(&day)
            .map(|day_bookings| day_bookings.values().map(Booking::revenue).sum())
            .unwrap_or(0.0)
    }

    pub fn bookings_on(&self, day: usize) -> impl Iterator<Item = (&BookingId, &Booking)> {
        self.bookings.get(&day).into_iter().flat_map(|b| b.iter())
    }

    #[cfg(test)]
    fn pending_cancellations(&self, day: usize) -> usize {
        self.cancel_days.get(&day).map_or(0, Vec::len)
    }

    /// Share of room-days never sold over the whole horizon
    pub fn vacancy_ratio(&self) -> f64 {
        if self.state.is_empty() {
            return 1.0;
        }
        let vacant = self.state.iter().filter(|cell| cell.is_none()).count();
        vacant as f64 / self.state.len() as f64
    }

    pub fn occupancy_ratio(&self) -> f64 {
        1.0 - self.vacancy_ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(
        los: usize,
        persons: usize,
        depth: usize,
        offset: Option<usize>,
        day: usize,
    ) -> Request {
        Request::new(los, persons, depth, offset).filled(day)
    }

    #[test]
    fn empty_hotel_offers_every_room() {
        let hotel = Hotel::new(4, 10);
        let request = filled(2, 1, 1, None, 0);
        assert_eq!(hotel.is_vacant(&request), vec![0, 1, 2, 3]);
    }

    #[test]
    fn booking_holds_rooms_for_inclusive_range() {
        let mut hotel = Hotel::new(3, 10);
        let request = filled(2, 2, 1, None, 0); // days 1..=3
        let rooms = hotel.is_vacant(&request);
        hotel.booking(&request, &rooms, BookingId(1), 800.0);

        for room in 0..2 {
            assert_eq!(hotel.occupant(room, 0), None);
            for day in 1..=3 {
                assert_eq!(hotel.occupant(room, day), Some(BookingId(1)));
            }
            assert_eq!(hotel.occupant(room, 4), None);
        }
        assert_eq!(hotel.occupant(2, 2), None);
        assert_eq!(hotel.get_loading(2), 2);
        assert_eq!(hotel.get_loading(0), 0);
    }

    #[test]
    fn partial_overlap_blocks_room() {
        let mut hotel = Hotel::new(2, 10);
        let first = filled(2, 1, 2, None, 0); // days 2..=4
        hotel.booking(&first, &[0], BookingId(1), 1000.0);

        let overlapping = filled(3, 1, 0, None, 4); // days 4..=7
        assert_eq!(hotel.is_vacant(&overlapping), vec![1]);

        let disjoint = filled(1, 1, 5, None, 0); // days 5..=6
        assert_eq!(hotel.is_vacant(&disjoint), vec![0, 1]);
    }

    #[test]
    fn not_enough_rooms_means_no_fit() {
        let mut hotel = Hotel::new(2, 10);
        hotel.booking(&filled(1, 1, 0, None, 0), &[0], BookingId(1), 1000.0);

        let party = filled(1, 2, 0, None, 0);
        assert!(hotel.is_vacant(&party).is_empty());
    }

    #[test]
    fn revenue_is_per_person_for_the_arrival_day() {
        let mut hotel = Hotel::new(5, 10);
        let a = filled(3, 2, 2, None, 0);
        let b = filled(1, 1, 0, None, 2);
        hotel.booking(&a, &hotel.is_vacant(&a), BookingId(1), 900.0);
        hotel.booking(&b, &hotel.is_vacant(&b), BookingId(2), 1100.0);

        assert_eq!(hotel.get_revenue(2), 2.0 * 900.0 + 1100.0);
        assert_eq!(hotel.get_revenue(3), 0.0);
        assert_eq!(hotel.bookings_on(2).count(), 2);
    }

    #[test]
    fn cancellation_restores_cells_and_ledger() {
        let mut hotel = Hotel::new(3, 10);
        let request = filled(2, 2, 5, Some(3), 0); // stay 5..=7, cancels day 2
        let rooms = hotel.is_vacant(&request);
        hotel.booking(&request, &rooms, BookingId(7), 1000.0);
        assert_eq!(hotel.pending_cancellations(2), 1);
        assert_eq!(hotel.get_revenue(5), 2000.0);

        assert_eq!(hotel.cancel_request(1), 0);
        assert_eq!(hotel.cancel_request(2), 1);

        for room in 0..3 {
            for day in 0..10 {
                assert_eq!(hotel.occupant(room, day), None);
            }
        }
        assert_eq!(hotel.get_revenue(5), 0.0);
        assert_eq!(hotel.pending_cancellations(2), 0);
        assert_eq!(hotel.vacancy_ratio(), 1.0);
    }

    #[test]
    fn cancelling_twice_is_a_no_op() {
        let mut hotel = Hotel::new(1, 10);
        let request = filled(1, 1, 2, Some(1), 0);
        hotel.booking(&request, &[0], BookingId(1), 1000.0);

        assert_eq!(hotel.cancel_request(1), 1);
        assert_eq!(hotel.cancel_request(1), 0);
    }

    #[test]
    fn stays_are_clipped_at_horizon() {
        let mut hotel = Hotel::new(2, 5);
        let request = filled(4, 1, 3, None, 0); // days 3..=7, horizon ends at 4
        let rooms = hotel.is_vacant(&request);
        hotel.booking(&request, &rooms, BookingId(1), 1000.0);

        assert_eq!(hotel.occupant(0, 3), Some(BookingId(1)));
        assert_eq!(hotel.occupant(0, 4), Some(BookingId(1)));
        assert_eq!(hotel.get_loading(4), 1);
        assert_eq!(hotel.get_loading(5), 0);
        assert_eq!(hotel.get_revenue(3), 1000.0);
    }

    #[test]
    fn stays_beyond_horizon_touch_no_cells() {
        let mut hotel = Hotel::new(1, 5);
        let request = filled(2, 1, 10, None, 0);
        assert_eq!(hotel.is_vacant(&request), vec![0]);
        hotel.booking(&request, &[0], BookingId(1), 1000.0);

        assert_eq!(hotel.vacancy_ratio(), 1.0);
        assert_eq!(hotel.get_revenue(10), 1000.0);
    }

    #[test]
    fn vacancy_ratio_counts_room_days() {
        let mut hotel = Hotel::new(2, 10);
        hotel.booking(&filled(4, 1, 0, None, 0), &[1], BookingId(1), 1000.0); // 5 cells
        assert_eq!(hotel.vacancy_ratio(), 15.0 / 20.0);
        assert_eq!(hotel.occupancy_ratio(), 5.0 / 20.0);
    }

    #[test]
    #[should_panic(expected = "overlaps")]
    fn double_booking_panics() {
        let mut hotel = Hotel::new(1, 10);
        hotel.booking(&filled(2, 1, 0, None, 0), &[0], BookingId(1), 1000.0);
        hotel.booking(&filled(2, 1, 1, None, 0), &[0], BookingId(2), 1000.0);
    }
}
