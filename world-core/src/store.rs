//! `Store` abstracts the relational database that owns player accounts,
//! inventories, bank storage, persisted entity state, and moderation
//! records. The simulation only ever talks to this trait; `game-server`
//! wires a concrete implementation (e.g. sqlx against Postgres) behind it.
//! `InMemoryStore` is the default implementation, used in tests and for
//! running without an external database.

use crate::ids::PlayerId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_id: u32,
    pub quantity: u32,
}

pub type InventorySlots = Vec<Option<ItemStack>>;
pub type BankTabs = Vec<InventorySlots>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: u64,
    pub kind: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBan {
    pub reason: String,
    pub banned_at_unix: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound,
    Backend(String),
    /// Postgres 40P01: two transactions waited on each other's locks.
    Deadlock,
    /// Postgres 40001: the serializable transaction couldn't be applied
    /// without violating isolation.
    Serialization,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "not found"),
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
            StoreError::Deadlock => write!(f, "deadlock detected (40P01)"),
            StoreError::Serialization => write!(f, "serialization failure (40001)"),
        }
    }
}

impl std::error::Error for StoreError {}

/// The persistence boundary. Every method is independently atomic at the
/// row/record level; multi-record atomicity (trade/duel settlement) is the
/// caller's responsibility, implemented against `transaction` in `economy`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_inventory(&self, player: PlayerId) -> Result<InventorySlots, StoreError>;
    async fn set_inventory(&self, player: PlayerId, slots: InventorySlots) -> Result<(), StoreError>;

    async fn get_bank(&self, player: PlayerId) -> Result<BankTabs, StoreError>;
    async fn set_bank(&self, player: PlayerId, tabs: BankTabs) -> Result<(), StoreError>;

    async fn save_entity(&self, snapshot: EntitySnapshot) -> Result<(), StoreError>;
    async fn load_entities(&self) -> Result<Vec<EntitySnapshot>, StoreError>;

    async fn is_banned(&self, player: PlayerId) -> Result<bool, StoreError>;
    async fn ban_user(&self, player: PlayerId, ban: UserBan) -> Result<(), StoreError>;
    async fn unban_user(&self, player: PlayerId) -> Result<(), StoreError>;

    /// Acquires the exclusive in-memory inventory lock `economy` holds for
    /// the duration of a trade/duel settlement, backing the row-level
    /// `SELECT ... FOR UPDATE` the real transaction takes underneath.
    /// Non-reentrant: returns `false` if `player` is already locked.
    async fn lock_for_transaction(&self, player: PlayerId) -> bool;

    /// Releases a lock taken by `lock_for_transaction`. Callers release in
    /// a finally guard regardless of how the transaction ended.
    async fn unlock_transaction(&self, player: PlayerId);
}

/// Default in-process implementation, backed by mutex-guarded maps. Good
/// enough for tests and single-node deployments without a real database.
#[derive(Default)]
pub struct InMemoryStore {
    inventories: Mutex<HashMap<PlayerId, InventorySlots>>,
    banks: Mutex<HashMap<PlayerId, BankTabs>>,
    entities: Mutex<HashMap<u64, EntitySnapshot>>,
    bans: Mutex<HashMap<PlayerId, UserBan>>,
    locked: Mutex<HashSet<PlayerId>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_inventory(&self, player: PlayerId) -> Result<InventorySlots, StoreError> {
        Ok(self.inventories.lock().unwrap().get(&player).cloned().unwrap_or_default())
    }

    async fn set_inventory(&self, player: PlayerId, slots: InventorySlots) -> Result<(), StoreError> {
        self.inventories.lock().unwrap().insert(player, slots);
        Ok(())
    }

    async fn get_bank(&self, player: PlayerId) -> Result<BankTabs, StoreError> {
        Ok(self.banks.lock().unwrap().get(&player).cloned().unwrap_or_default())
    }

    async fn set_bank(&self, player: PlayerId, tabs: BankTabs) -> Result<(), StoreError> {
        self.banks.lock().unwrap().insert(player, tabs);
        Ok(())
    }

    async fn save_entity(&self, snapshot: EntitySnapshot) -> Result<(), StoreError> {
        self.entities.lock().unwrap().insert(snapshot.entity_id, snapshot);
        Ok(())
    }

    async fn load_entities(&self) -> Result<Vec<EntitySnapshot>, StoreError> {
        Ok(self.entities.lock().unwrap().values().cloned().collect())
    }

    async fn is_banned(&self, player: PlayerId) -> Result<bool, StoreError> {
        Ok(self.bans.lock().unwrap().contains_key(&player))
    }

    async fn ban_user(&self, player: PlayerId, ban: UserBan) -> Result<(), StoreError> {
        self.bans.lock().unwrap().insert(player, ban);
        Ok(())
    }

    async fn unban_user(&self, player: PlayerId) -> Result<(), StoreError> {
        self.bans.lock().unwrap().remove(&player);
        Ok(())
    }

    async fn lock_for_transaction(&self, player: PlayerId) -> bool {
        self.locked.lock().unwrap().insert(player)
    }

    async fn unlock_transaction(&self, player: PlayerId) {
        self.locked.lock().unwrap().remove(&player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inventory_round_trips() {
        let store = InMemoryStore::new();
        let player = PlayerId(1);
        let slots = vec![Some(ItemStack { item_id: 995, quantity: 100 }), None];
        store.set_inventory(player, slots.clone()).await.unwrap();
        assert_eq!(store.get_inventory(player).await.unwrap(), slots);
    }

    #[tokio::test]
    async fn banning_then_unbanning_clears_the_flag() {
        let store = InMemoryStore::new();
        let player = PlayerId(1);
        assert!(!store.is_banned(player).await.unwrap());
        store
            .ban_user(player, UserBan { reason: "cheating".into(), banned_at_unix: 0 })
            .await
            .unwrap();
        assert!(store.is_banned(player).await.unwrap());
        store.unban_user(player).await.unwrap();
        assert!(!store.is_banned(player).await.unwrap());
    }

    #[tokio::test]
    async fn transaction_lock_is_not_reentrant() {
        let store = InMemoryStore::new();
        let player = PlayerId(1);
        assert!(store.lock_for_transaction(player).await);
        assert!(!store.lock_for_transaction(player).await);
        store.unlock_transaction(player).await;
        assert!(store.lock_for_transaction(player).await);
    }
}
