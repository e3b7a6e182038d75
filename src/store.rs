//! Master/slave partition of the clients managed by one layout.
//!
//! A [`Store`] keeps two ordered lists.  The *masters* occupy the primary
//! screen region and are bounded by [`Store::allowed_masters`]; everything
//! else lives in the *slaves* list.  Order inside each list is significant:
//! it is the on-screen priority and the focus cycle order.
//!
//! Invariants kept by every operation:
//!
//! * `masters.len() <= allowed_masters`
//! * a client appears at most once across both lists
//! * the union of both lists is exactly the set of added, not yet removed
//!   clients

use crate::command::ClientId;

/// Master/slave partition for one layout instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    allowed_masters: usize,
    masters: Vec<ClientId>,
    slaves: Vec<ClientId>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// An empty store that allows a single master.
    pub fn new() -> Self {
        Self {
            allowed_masters: 1,
            masters: Vec::new(),
            slaves: Vec::new(),
        }
    }

    pub fn allowed_masters(&self) -> usize {
        self.allowed_masters
    }

    pub fn masters(&self) -> &[ClientId] {
        &self.masters
    }

    pub fn slaves(&self) -> &[ClientId] {
        &self.slaves
    }

    /// All clients in priority order: masters first, then slaves.
    pub fn all(&self) -> Vec<ClientId> {
        self.masters.iter().chain(&self.slaves).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.masters.len() + self.slaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masters.is_empty() && self.slaves.is_empty()
    }

    pub fn contains(&self, client: ClientId) -> bool {
        self.masters.contains(&client) || self.slaves.contains(&client)
    }

    /// Append `client` to the masters while there is room, otherwise to the
    /// slaves.  Adding a client that is already present is a no-op.
    pub fn add(&mut self, client: ClientId) {
        if self.contains(client) {
            return;
        }
        if self.masters.len() < self.allowed_masters {
            self.masters.push(client);
        } else {
            self.slaves.push(client);
        }
    }

    /// Remove `client`.
    ///
    /// A removed master is replaced in place by the first slave, if any.
    pub fn remove(&mut self, client: ClientId) {
        if let Some(i) = self.masters.iter().position(|&m| m == client) {
            if self.slaves.is_empty() {
                self.masters.remove(i);
            } else {
                self.masters[i] = self.slaves.remove(0);
            }
            return;
        }
        if let Some(i) = self.slaves.iter().position(|&s| s == client) {
            self.slaves.remove(i);
        }
    }

    /// Promote the first slave and allow one more master.
    ///
    /// Only happens while more than one slave exists, so the slave area is
    /// never emptied by promotion.
    pub fn inc_master(&mut self) {
        if self.slaves.len() > 1 {
            self.allowed_masters += 1;
            let promoted = self.slaves.remove(0);
            self.masters.push(promoted);
        }
    }

    /// Demote the last master to the front of the slaves and allow one
    /// master fewer.  At least one master is always kept.
    pub fn decrease_master(&mut self) {
        if self.masters.len() > 1 {
            self.allowed_masters -= 1;
            if let Some(demoted) = self.masters.pop() {
                self.slaves.insert(0, demoted);
            }
        }
    }

    /// Exchange the slave `id` with the first master.
    ///
    /// Only the slaves are searched: a client that already is a master is
    /// reported as not found.
    pub fn make_master_by_id(&mut self, id: ClientId) -> bool {
        let Some(i) = self.slaves.iter().position(|&s| s == id) else {
            return false;
        };
        match self.masters.first_mut() {
            Some(first) => {
                std::mem::swap(first, &mut self.slaves[i]);
                true
            }
            None => false,
        }
    }

    /// Exchange the positions of `a` and `b`, wherever they are.
    ///
    /// Returns `false` and leaves the store untouched if either id is
    /// missing.
    pub fn swap_by_id(&mut self, a: ClientId, b: ClientId) -> bool {
        let (Some(pa), Some(pb)) = (self.locate(a), self.locate(b)) else {
            return false;
        };
        match (pa, pb) {
            (Slot::Master(i), Slot::Master(j)) => self.masters.swap(i, j),
            (Slot::Slave(i), Slot::Slave(j)) => self.slaves.swap(i, j),
            (Slot::Master(i), Slot::Slave(j)) | (Slot::Slave(j), Slot::Master(i)) => {
                std::mem::swap(&mut self.masters[i], &mut self.slaves[j]);
            }
        }
        true
    }

    /// The client after `active` in priority order, wrapping around.
    ///
    /// `None` when `active` is not in this store.
    pub fn next(&self, active: ClientId) -> Option<ClientId> {
        let clients = self.all();
        let i = clients.iter().position(|&c| c == active)?;
        Some(clients[(i + 1) % clients.len()])
    }

    /// The client before `active` in priority order, wrapping around.
    pub fn previous(&self, active: ClientId) -> Option<ClientId> {
        let clients = self.all();
        let i = clients.iter().position(|&c| c == active)?;
        Some(clients[(i + clients.len() - 1) % clients.len()])
    }

    fn locate(&self, id: ClientId) -> Option<Slot> {
        if let Some(i) = self.masters.iter().position(|&m| m == id) {
            return Some(Slot::Master(i));
        }
        self.slaves.iter().position(|&s| s == id).map(Slot::Slave)
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Master(usize),
    Slave(usize),
}
