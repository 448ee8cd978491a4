//! Ticket sequencer for asynchronous completions.
//!
//! Key properties:
//! - Tickets are issued with strictly increasing ids.
//! - Under [`ReleaseOrder::Issue`], completions are buffered and released in
//!   ticket order; a completion is held back until every earlier ticket has
//!   completed.
//! - Under [`ReleaseOrder::Completion`], completions are released as soon as
//!   they arrive.
//! - A ticket can complete only once.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ReleaseOrder {
    /// Release in the order tickets were issued.
    #[default]
    Issue,
    /// Release in the order completions arrive.
    Completion,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// The ticket was never issued, or already completed.
    UnknownTicket(Ticket),
}

impl std::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceError::UnknownTicket(t) => write!(f, "unknown or completed ticket {t}"),
        }
    }
}

impl std::error::Error for SequenceError {}

/// Issues tickets and hands completions back per its [`ReleaseOrder`].
#[derive(Debug)]
pub struct Sequencer<T> {
    order: ReleaseOrder,
    next_id: u64,
    outstanding: BTreeSet<Ticket>,
    completed: BTreeMap<Ticket, T>,
}

impl<T> Sequencer<T> {
    pub fn new(order: ReleaseOrder) -> Self {
        Self {
            order,
            next_id: 0,
            outstanding: BTreeSet::new(),
            completed: BTreeMap::new(),
        }
    }

    pub fn order(&self) -> ReleaseOrder {
        self.order
    }

    pub fn issue(&mut self) -> Ticket {
        let ticket = Ticket(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.outstanding.insert(ticket);
        ticket
    }

    /// Number of issued tickets not yet released.
    pub fn in_flight(&self) -> usize {
        self.outstanding.len()
    }

    /// Number of completions held back waiting for an earlier ticket.
    pub fn buffered(&self) -> usize {
        self.completed.len()
    }

    /// Records the completion of `ticket` and returns every completion that
    /// is now ready for release, in release order.
    pub fn complete(&mut self, ticket: Ticket, value: T) -> Result<Vec<(Ticket, T)>, SequenceError> {
        if !self.outstanding.contains(&ticket) || self.completed.contains_key(&ticket) {
            return Err(SequenceError::UnknownTicket(ticket));
        }

        match self.order {
            ReleaseOrder::Completion => {
                self.outstanding.remove(&ticket);
                Ok(vec![(ticket, value)])
            }
            ReleaseOrder::Issue => {
                self.completed.insert(ticket, value);
                Ok(self.drain_ready())
            }
        }
    }

    fn drain_ready(&mut self) -> Vec<(Ticket, T)> {
        let mut out = Vec::new();
        while let Some(&head) = self.outstanding.first() {
            let Some(value) = self.completed.remove(&head) else {
                break;
            };
            self.outstanding.remove(&head);
            out.push((head, value));
        }
        out
    }
}
