// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Port allocation for dynamic agents.
//!
//! A port is held from allocation until `release`; no port is handed out
//! twice while held. Allocation walks the range round-robin from the last
//! handed-out port so a just-released port is not immediately reused.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::net::TcpListener;
use tracing::debug;

#[derive(Debug)]
struct PortState {
    in_use: BTreeSet<u16>,
    next: u16,
}

#[derive(Debug)]
pub struct PortAllocator {
    start: u16,
    end: u16,
    /// Bind-test candidates and skip ports held outside the allocator
    probe_host: Option<String>,
    state: Mutex<PortState>,
}

impl PortAllocator {
    /// `end` is inclusive
    pub fn new(start: u16, end: u16) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            start,
            end,
            probe_host: None,
            state: Mutex::new(PortState {
                in_use: BTreeSet::new(),
                next: start,
            }),
        }
    }

    pub fn with_probe(mut self, host: impl Into<String>) -> Self {
        self.probe_host = Some(host.into());
        self
    }

    pub fn range(&self) -> (u16, u16) {
        (self.start, self.end)
    }

    pub fn capacity(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    pub fn allocated(&self) -> usize {
        self.state.lock().in_use.len()
    }

    pub fn is_allocated(&self, port: u16) -> bool {
        self.state.lock().in_use.contains(&port)
    }

    pub fn allocate(&self) -> Option<u16> {
        let mut state = self.state.lock();
        let span = self.capacity();
        let offset = state.next.saturating_sub(self.start) as usize;

        for i in 0..span {
            let port = self.start + ((offset + i) % span) as u16;
            if state.in_use.contains(&port) || !self.is_bindable(port) {
                continue;
            }
            state.in_use.insert(port);
            state.next = if port == self.end { self.start } else { port + 1 };
            debug!(port, allocated = state.in_use.len(), "Port allocated");
            return Some(port);
        }
        None
    }

    /// Returns false if the port was not held
    pub fn release(&self, port: u16) -> bool {
        let released = self.state.lock().in_use.remove(&port);
        if released {
            debug!(port, "Port released");
        }
        released
    }

    fn is_bindable(&self, port: u16) -> bool {
        match &self.probe_host {
            Some(host) => TcpListener::bind((host.as_str(), port)).is_ok(),
            None => true,
        }
    }
}
