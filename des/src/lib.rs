//! Day-stepped discrete-event engine
//!
//! Agents receive every event in the order it was scheduled: earliest day
//! first, and events scheduled for the same day in the order they were pushed.
//! The FIFO tie-break matters for models that close a day only after every
//! event of that day has been seen.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

pub mod parallel;

struct Event<T> {
    day: usize,
    seq: u64,
    data: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.day == other.day && self.seq == other.seq
    }
}

impl<T> Eq for Event<T> {}

impl<T> Ord for Event<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so the max-heap pops the earliest event
        other
            .day
            .cmp(&self.day)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What an agent hands back to the loop after reacting to an event
pub struct Response<T, S> {
    pub events: Vec<(usize, T)>,
    pub agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> Response<T, S> {
    pub fn new() -> Response<T, S> {
        Response {
            events: Vec::new(),
            agents: Vec::new(),
        }
    }

    pub fn event(day: usize, data: T) -> Response<T, S> {
        Response {
            events: vec![(day, data)],
            agents: Vec::new(),
        }
    }
}

impl<T, S> Default for Response<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Agent<T, S> {
    fn act(&mut self, _current_day: usize, _data: &T) -> Response<T, S> {
        Response::new()
    }

    fn stats(&self) -> S;
}

pub struct EventLoop<T, S> {
    queue: BinaryHeap<Event<T>>,
    current_day: usize,
    next_seq: u64,
    agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> EventLoop<T, S> {
    pub fn new(events: Vec<(usize, T)>, agents: Vec<Box<dyn Agent<T, S>>>) -> EventLoop<T, S> {
        let mut event_loop = EventLoop {
            queue: BinaryHeap::with_capacity(events.len()),
            current_day: 0,
            next_seq: 0,
            agents,
        };
        for (day, data) in events {
            event_loop.schedule(day, data);
        }
        event_loop
    }

    fn schedule(&mut self, day: usize, data: T) {
        self.queue.push(Event {
            day,
            seq: self.next_seq,
            data,
        });
        self.next_seq += 1;
    }

    pub fn current_day(&self) -> usize {
        self.current_day
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn broadcast(&mut self) {
        let Some(event) = self.queue.pop() else {
            return;
        };
        self.current_day = event.day;

        let mut new_events = Vec::new();
        let mut new_agents = Vec::new();
        for agent in &mut self.agents {
            let response = agent.act(self.current_day, &event.data);
            new_events.extend(response.events);
            new_agents.extend(response.agents);
        }

        for (day, data) in new_events {
            // the past is closed
            if day >= self.current_day {
                self.schedule(day, data);
            }
        }
        self.agents.extend(new_agents);
    }

    /// Process events until the queue drains or the next event lies beyond `until_day`
    pub fn run(&mut self, until_day: usize) {
        while let Some(next) = self.queue.peek() {
            if next.day > until_day {
                break;
            }
            self.broadcast();
        }
    }

    pub fn stats(&self) -> Vec<S> {
        self.agents.iter().map(|agent| agent.stats()).collect()
    }
}
