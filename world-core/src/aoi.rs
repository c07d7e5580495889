//! Area-of-interest spatial partitioning: a square-cell grid that tracks
//! which entities occupy each cell and which sockets subscribe to it.

use crate::ids::{EntityId, SocketId};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_CELL_SIZE: f32 = 50.0;
pub const DEFAULT_VIEW_DISTANCE: i32 = 2;

type CellKey = (i32, i32);

#[derive(Default)]
struct Cell {
    occupants: HashSet<EntityId>,
    subscribers: HashSet<SocketId>,
}

/// Entered/exited cell deltas for a player's subscription update.
#[derive(Debug, Default, Clone)]
pub struct SubscriptionDelta {
    pub entered: Vec<EntityId>,
    pub exited: Vec<EntityId>,
}

pub struct AoiManager {
    cell_size: f32,
    view_distance: i32,
    cells: HashMap<CellKey, Cell>,
    entity_cell: HashMap<EntityId, CellKey>,
    player_subscriptions: HashMap<SocketId, HashSet<CellKey>>,
}

impl AoiManager {
    pub fn new(cell_size: f32, view_distance: i32) -> Self {
        AoiManager {
            cell_size,
            view_distance,
            cells: HashMap::new(),
            entity_cell: HashMap::new(),
            player_subscriptions: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CELL_SIZE, DEFAULT_VIEW_DISTANCE)
    }

    fn cell_key(&self, x: f32, z: f32) -> CellKey {
        (
            (x / self.cell_size).floor() as i32,
            (z / self.cell_size).floor() as i32,
        )
    }

    fn cells_in_view(&self, center: CellKey) -> HashSet<CellKey> {
        let vd = self.view_distance;
        let mut set = HashSet::new();
        for dx in -vd..=vd {
            for dz in -vd..=vd {
                set.insert((center.0 + dx, center.1 + dz));
            }
        }
        set
    }

    /// Moves `entity` to the cell for `(x, z)`, returning `true` if the cell
    /// changed.
    pub fn update_entity_position(&mut self, entity: EntityId, x: f32, z: f32) -> bool {
        let new_cell = self.cell_key(x, z);
        if self.entity_cell.get(&entity) == Some(&new_cell) {
            return false;
        }
        if let Some(old_cell) = self.entity_cell.remove(&entity)
            && let Some(cell) = self.cells.get_mut(&old_cell)
        {
            cell.occupants.remove(&entity);
        }
        self.cells.entry(new_cell).or_default().occupants.insert(entity);
        self.entity_cell.insert(entity, new_cell);
        true
    }

    pub fn remove_entity(&mut self, entity: EntityId) {
        if let Some(cell) = self.entity_cell.remove(&entity)
            && let Some(cell) = self.cells.get_mut(&cell)
        {
            cell.occupants.remove(&entity);
        }
    }

    /// Recomputes the `(2*vd+1)^2` cells `socket` subscribes to around
    /// `(x, z)`, returning per-cell enter/exit deltas.
    pub fn update_player_subscriptions(
        &mut self,
        x: f32,
        z: f32,
        socket: SocketId,
    ) -> SubscriptionDelta {
        let center = self.cell_key(x, z);
        let new_cells = self.cells_in_view(center);
        let old_cells = self
            .player_subscriptions
            .get(&socket)
            .cloned()
            .unwrap_or_default();

        let mut delta = SubscriptionDelta::default();

        for cell_key in new_cells.difference(&old_cells) {
            self.cells.entry(*cell_key).or_default().subscribers.insert(socket);
            if let Some(cell) = self.cells.get(cell_key) {
                delta.entered.extend(cell.occupants.iter().copied());
            }
        }
        for cell_key in old_cells.difference(&new_cells) {
            if let Some(cell) = self.cells.get_mut(cell_key) {
                cell.subscribers.remove(&socket);
                delta.exited.extend(cell.occupants.iter().copied());
            }
        }

        self.player_subscriptions.insert(socket, new_cells);
        delta
    }

    pub fn on_player_disconnect(&mut self, socket: SocketId) {
        if let Some(cells) = self.player_subscriptions.remove(&socket) {
            for cell_key in cells {
                if let Some(cell) = self.cells.get_mut(&cell_key) {
                    cell.subscribers.remove(&socket);
                }
            }
        }
    }

    /// All sockets subscribed to the cell containing `entity`.
    pub fn subscribers_for_entity(&self, entity: EntityId) -> HashSet<SocketId> {
        self.entity_cell
            .get(&entity)
            .and_then(|cell| self.cells.get(cell))
            .map(|cell| cell.subscribers.clone())
            .unwrap_or_default()
    }

    pub fn can_player_see_entity(&self, socket: SocketId, entity: EntityId) -> bool {
        let Some(entity_cell) = self.entity_cell.get(&entity) else {
            return false;
        };
        self.player_subscriptions
            .get(&socket)
            .map(|cells| cells.contains(entity_cell))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PlayerId;

    #[test]
    fn subscriber_receives_entity_added_for_entities_in_view() {
        let mut aoi = AoiManager::new(50.0, 1);
        let mob = EntityId::Player(PlayerId(99));
        aoi.update_entity_position(mob, 10.0, 10.0);

        let socket = SocketId(1);
        let delta = aoi.update_player_subscriptions(10.0, 10.0, socket);
        assert!(delta.entered.contains(&mob));
        assert!(aoi.can_player_see_entity(socket, mob));
    }

    #[test]
    fn moving_out_of_view_emits_exit() {
        let mut aoi = AoiManager::new(50.0, 0); // single-cell view.
        let mob = EntityId::Player(PlayerId(99));
        aoi.update_entity_position(mob, 10.0, 10.0);
        let socket = SocketId(1);
        aoi.update_player_subscriptions(10.0, 10.0, socket);
        assert!(aoi.can_player_see_entity(socket, mob));

        // Player moves far away; re-subscribe.
        let delta = aoi.update_player_subscriptions(1000.0, 1000.0, socket);
        assert!(delta.exited.contains(&mob));
        assert!(!aoi.can_player_see_entity(socket, mob));
    }
}
