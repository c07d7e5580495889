//! Small trait seams for the external systems this crate depends on only
//! abstractly: terrain height, the item catalog, and account
//! authentication. Each ships a default good enough for tests and for
//! running without the real system behind it, the same way [`store::Store`]
//! ships [`store::InMemoryStore`].

use async_trait::async_trait;

/// Terrain sampling for spawn/respawn placement and line-of-sight checks.
pub trait TerrainHeightProvider: Send + Sync {
    fn height_at(&self, x: f32, z: f32) -> f32;
}

#[derive(Default)]
pub struct FlatTerrain;

impl TerrainHeightProvider for FlatTerrain {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        0.0
    }
}

/// Item metadata the trade/duel-stake and inventory paths need: whether an
/// item can change hands, whether it merges into an existing stack, and
/// the stack size that triggers the 32-bit overflow check.
pub trait ItemCatalog: Send + Sync {
    fn is_tradeable(&self, item_id: u32) -> bool;
    fn is_stackable(&self, item_id: u32) -> bool;
    fn max_stack_size(&self, item_id: u32) -> u32;
}

#[derive(Default)]
pub struct PermissiveItemCatalog;

impl ItemCatalog for PermissiveItemCatalog {
    fn is_tradeable(&self, _item_id: u32) -> bool {
        true
    }

    fn is_stackable(&self, _item_id: u32) -> bool {
        true
    }

    fn max_stack_size(&self, _item_id: u32) -> u32 {
        u32::MAX
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(pub u64);

/// Authenticates a connecting client's token into an account id. Real
/// auth happens upstream of game logic; this seam exists so `world-core`
/// never has to know what that upstream system is.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, token: &str) -> Option<AccountId>;
}

/// Accepts any non-empty token, deriving the account id from it when
/// possible. Assumes real auth happens upstream of this process.
#[derive(Default)]
pub struct AlwaysAcceptAuth;

#[async_trait]
impl AuthProvider for AlwaysAcceptAuth {
    async fn authenticate(&self, token: &str) -> Option<AccountId> {
        if token.is_empty() {
            return None;
        }
        Some(token.parse::<u64>().map(AccountId).unwrap_or(AccountId(0)))
    }
}
