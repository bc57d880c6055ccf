// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Watchable view state with stale-fetch protection.
//!
//! A fetch calls [`Store::begin`] to get a [`Ticket`] before it issues any
//! query, and hands the ticket back to [`Store::commit`] or [`Store::finish`].
//! Starting a newer fetch or calling [`Store::invalidate`] retires every
//! outstanding ticket, so a fetch that resolves late never overwrites newer
//! state.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Data plus its loading flag, as observed by consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Loadable<T> {
    pub data: T,
    pub loading: bool,
}

/// Proof that a fetch was started at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

pub struct Store<T> {
    state: watch::Sender<Loadable<T>>,
    generation: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// New store in the loading state.
    pub fn new(initial: T) -> Self {
        let (state, _) = watch::channel(Loadable {
            data: initial,
            loading: true,
        });
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Loadable<T> {
        self.state.borrow().clone()
    }

    pub fn data(&self) -> T {
        self.state.borrow().data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<Loadable<T>> {
        self.state.subscribe()
    }

    /// Start a fetch: mark loading and retire older tickets.
    pub fn begin(&self) -> Ticket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.loading, true));
        Ticket(generation)
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Store fetched data if the ticket is still current.
    ///
    /// Returns false (and changes nothing) for a retired ticket.
    pub fn commit(&self, ticket: Ticket, data: T) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.state.send_replace(Loadable {
            data,
            loading: false,
        });
        true
    }

    /// End a failed fetch, keeping the previous data.
    pub fn finish(&self, ticket: Ticket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.state.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
        true
    }

    /// Retire every outstanding ticket.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Replace the data outright, retiring in-flight fetches.
    pub fn reset(&self, data: T) {
        self.invalidate();
        self.state.send_replace(Loadable {
            data,
            loading: false,
        });
    }

    /// Edit the data in place (local overlays such as optimistic updates).
    pub fn modify(&self, edit: impl FnOnce(&mut T)) {
        self.state.send_modify(|s| edit(&mut s.data));
    }
}
