//! Front desk agent
//!
//! On `DayStart { day }`:
//! 1. draw the day's requests and fill them against `day`
//! 2. for each request with a free room set: price, ask the guest, book on
//!    acceptance, report the outcome to the policy
//! 3. push the day's per-depth request counts to the policy
//! 4. reverse the cancellations scheduled for `day`
//! 5. realise revenue of stays arriving on `day`
//!
//! and announce the result as `DayClosed`.

use des::{Agent, Response};

use crate::acceptance::AcceptanceModel;
use crate::generator::RequestSource;
use crate::hotel::{BookingId, Hotel};
use crate::pricing::{DepthCounts, PricingContext, PricingPolicy};
use crate::{DaySummary, DeskStats, Event, Stats};

pub struct FrontDesk {
    hotel: Hotel,
    requests: Box<dyn RequestSource>,
    acceptance: AcceptanceModel,
    policy: Box<dyn PricingPolicy>,
    /// Every request consumes an id, booked or not
    next_id: u64,
    days_open: usize,
    requests_seen: usize,
    no_vacancy: usize,
    offers: usize,
    bookings: usize,
    cancellations: usize,
}

impl FrontDesk {
    pub fn new(
        hotel: Hotel,
        requests: Box<dyn RequestSource>,
        acceptance: AcceptanceModel,
        policy: Box<dyn PricingPolicy>,
    ) -> Self {
        FrontDesk {
            hotel,
            requests,
            acceptance,
            policy,
            next_id: 1,
            days_open: 0,
            requests_seen: 0,
            no_vacancy: 0,
            offers: 0,
            bookings: 0,
            cancellations: 0,
        }
    }

    pub fn hotel(&self) -> &Hotel {
        &self.hotel
    }

    /// Work through one day and close it
    pub fn run_day(&mut self, day: usize) -> DaySummary {
        let mut summary = DaySummary::new(day);
        let mut counts = DepthCounts::new();

        for (handled, mut request) in self.requests.generate_requests().into_iter().enumerate() {
            request.fill(day);
            let id = BookingId(self.next_id);
            self.next_id += 1;
            summary.requests += 1;

            let rooms = self.hotel.is_vacant(&request);
            if rooms.is_empty() {
                summary.no_vacancy += 1;
                tracing::trace!(
                    day,
                    %id,
                    los = request.los,
                    persons = request.persons,
                    depth = request.depth,
                    "no vacancy"
                );
                continue;
            }

            let context = PricingContext {
                requests_today: handled,
            };
            let price = self.policy.set_price(&self.hotel, &request, &context);
            let accepted = self.acceptance.decision(price);
            tracing::trace!(
                day,
                %id,
                price,
                los = request.los,
                persons = request.persons,
                depth = request.depth,
                vacant_rooms = rooms.len(),
                accepted,
                "offer"
            );

            if accepted {
                self.hotel.booking(&request, &rooms, id, price);
                summary.bookings += 1;
            } else {
                summary.rejected += 1;
            }
            self.policy.update_history(price, accepted);
            counts.record(request.depth);
        }

        self.policy.update_queue(&counts);
        summary.cancellations = self.hotel.cancel_request(day);
        summary.revenue = self.hotel.get_revenue(day);
        summary.occupied = self.hotel.get_loading(day);

        self.days_open += 1;
        self.requests_seen += summary.requests;
        self.no_vacancy += summary.no_vacancy;
        self.offers += summary.offers();
        self.bookings += summary.bookings;
        self.cancellations += summary.cancellations;

        tracing::debug!(
            day,
            requests = summary.requests,
            bookings = summary.bookings,
            cancellations = summary.cancellations,
            occupied = summary.occupied,
            revenue = summary.revenue,
            "day closed"
        );
        summary
    }

    pub fn desk_stats(&self) -> DeskStats {
        DeskStats {
            number_of_rooms: self.hotel.number_of_rooms(),
            number_of_days: self.hotel.number_of_days(),
            days_open: self.days_open,
            requests: self.requests_seen,
            no_vacancy: self.no_vacancy,
            offers: self.offers,
            bookings: self.bookings,
            cancellations: self.cancellations,
            vacancy_ratio: self.hotel.vacancy_ratio(),
            occupancy_ratio: self.hotel.occupancy_ratio(),
            policy: self.policy.snapshot(),
        }
    }
}

impl Agent<Event, Stats> for FrontDesk {
    fn act(&mut self, current_day: usize, data: &Event) -> Response<Event, Stats> {
        match data {
            Event::DayStart { day } => {
                let summary = self.run_day(*day);
                Response::event(current_day, Event::DayClosed(summary))
            }
            _ => Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::Desk(self.desk_stats())
    }
}
