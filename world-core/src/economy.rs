//! Atomic economic transactions: trade swaps and duel stake settlements.
//!
//! Both flows share one discipline: acquire an exclusive in-memory lock on
//! every participant, re-verify each offered/staked item still exists where
//! it was claimed (a live inventory can have moved since negotiation ended),
//! remove it from the sender (Phase 1), then insert it into the recipient
//! (Phase 2) — falling back to bank storage (then dropping the item) if the
//! recipient's inventory has no room. Integrity failures and lock
//! contention abort the whole transaction before either phase runs, so a
//! rejected settlement leaves every inventory exactly as it was.

use crate::collaborators::ItemCatalog;
use crate::error::Reason;
use crate::ids::PlayerId;
use crate::store::{InventorySlots, ItemStack, Store, StoreError};
use crate::trading::TradeReady;
use protocol::names::limits::INVENTORY_SLOTS;
use std::collections::HashMap;
use std::future::Future;

/// Backoff schedule for a single recipient's credit attempt.
const INNER_BACKOFF_MS: [u64; 4] = [0, 50, 100, 200];
/// Backoff schedule for the whole two-party transaction, if every inner
/// attempt for a leg is exhausted.
const OUTER_BACKOFF_MS: [u64; 3] = [0, 1000, 3000];

#[derive(Debug, Clone)]
pub enum TransactionOutcome {
    Applied,
    /// Recipient's inventory and bank tab 0 were both full; the item(s)
    /// named were dropped.
    PartialDropped { player: PlayerId, dropped: Vec<ItemStack> },
    /// An integrity check failed before either side was touched; every
    /// inventory involved is unchanged.
    Rejected(Reason),
    Failed(StoreError),
}

/// Whether a store error is worth retrying rather than giving up on.
fn is_transient(err: &StoreError) -> bool {
    matches!(err, StoreError::Backend(_) | StoreError::Deadlock | StoreError::Serialization)
}

/// Sums every slot holding `item_id`, the live quantity a sender actually
/// has available regardless of how it's split across slots.
fn total_quantity(slots: &[Option<ItemStack>], item_id: u32) -> u32 {
    slots.iter().flatten().filter(|s| s.item_id == item_id).map(|s| s.quantity).sum()
}

/// Removes `quantity` of `item_id` from `slots`, clearing any slot it
/// drains to zero. Caller must have already verified enough is present.
fn debit_from(slots: &mut [Option<ItemStack>], item_id: u32, mut quantity: u32) {
    for slot in slots.iter_mut() {
        if quantity == 0 {
            break;
        }
        if let Some(stack) = slot
            && stack.item_id == item_id
        {
            let take = quantity.min(stack.quantity);
            stack.quantity -= take;
            quantity -= take;
            if stack.quantity == 0 {
                *slot = None;
            }
        }
    }
}

/// Tries to stack `item` into an existing matching stack (skipping the
/// merge on 32-bit overflow or past the catalog's max stack size), else
/// drops it into the first free slot.
fn merge_into(catalog: &dyn ItemCatalog, slots: &mut [Option<ItemStack>], item: ItemStack) -> bool {
    if catalog.is_stackable(item.item_id)
        && let Some(existing) = slots.iter_mut().flatten().find(|s| s.item_id == item.item_id)
    {
        let max = catalog.max_stack_size(item.item_id);
        if let Some(sum) = existing.quantity.checked_add(item.quantity)
            && sum <= max
        {
            existing.quantity = sum;
            return true;
        }
    }
    if let Some(slot) = slots.iter_mut().find(|s| s.is_none()) {
        *slot = Some(item);
        return true;
    }
    false
}

/// Would every item in `incoming` find a home in `slots` (stacking or a
/// free slot), without actually mutating `slots`?
fn fits(catalog: &dyn ItemCatalog, slots: &[Option<ItemStack>], incoming: &[ItemStack]) -> bool {
    let mut sandbox = slots.to_vec();
    incoming.iter().all(|item| merge_into(catalog, &mut sandbox, *item))
}

/// Re-checks `offer` against `slots` as they stand right now (not as they
/// stood at negotiation time) and, if every item is still tradeable and
/// present in at least the claimed quantity, removes it. Leaves `slots`
/// untouched and returns the first mismatch otherwise.
fn verify_and_debit(
    catalog: &dyn ItemCatalog,
    slots: &mut InventorySlots,
    offer: &[ItemStack],
) -> Result<(), Reason> {
    for item in offer {
        if !catalog.is_tradeable(item.item_id) {
            return Err(Reason::UntradeableItem);
        }
        if total_quantity(slots, item.item_id) < item.quantity {
            return Err(Reason::ItemChanged);
        }
    }
    for item in offer {
        debit_from(slots, item.item_id, item.quantity);
    }
    Ok(())
}

/// Credits `items` to `player`'s inventory, falling back to bank tab 0 on
/// overflow, then dropping whatever still doesn't fit.
async fn credit_player(
    store: &dyn Store,
    catalog: &dyn ItemCatalog,
    player: PlayerId,
    items: Vec<ItemStack>,
) -> Result<Vec<ItemStack>, StoreError> {
    let mut inventory = store.get_inventory(player).await?;
    inventory.resize(INVENTORY_SLOTS, None);
    let mut bank = store.get_bank(player).await?;
    if bank.is_empty() {
        bank.push(Vec::new());
    }

    let mut dropped = Vec::new();
    for item in items {
        if merge_into(catalog, &mut inventory, item) {
            continue;
        }
        if merge_into(catalog, &mut bank[0], item) {
            continue;
        }
        tracing::error!(player = %player, item_id = item.item_id, "bank tab 0 full, dropping item");
        dropped.push(item);
    }

    store.set_inventory(player, inventory).await?;
    store.set_bank(player, bank).await?;
    Ok(dropped)
}

/// Retries `credit_player` against the inner backoff schedule, treating
/// deadlocks, serialization failures, and opaque backend errors as
/// transient.
async fn credit_with_retry(
    store: &dyn Store,
    catalog: &dyn ItemCatalog,
    player: PlayerId,
    items: Vec<ItemStack>,
) -> Result<Vec<ItemStack>, StoreError> {
    let mut last_err = None;
    for delay_ms in INNER_BACKOFF_MS {
        if delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
        }
        match credit_player(store, catalog, player, items.clone()).await {
            Ok(dropped) => return Ok(dropped),
            Err(err) if is_transient(&err) => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last_err.expect("at least one attempt runs"))
}

/// Locks both participants for the duration of `body`, releasing both in
/// a finally guard regardless of how `body` finishes. Lock failure rejects
/// the transaction before `body` ever runs.
async fn with_both_locked<F, Fut>(store: &dyn Store, a: PlayerId, b: PlayerId, body: F) -> TransactionOutcome
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = TransactionOutcome>,
{
    if !store.lock_for_transaction(a).await {
        return TransactionOutcome::Rejected(Reason::ServerError);
    }
    if !store.lock_for_transaction(b).await {
        store.unlock_transaction(a).await;
        return TransactionOutcome::Rejected(Reason::ServerError);
    }

    let outcome = body().await;

    store.unlock_transaction(a).await;
    store.unlock_transaction(b).await;
    outcome
}

/// One attempt at the whole swap: re-verify and debit both offers, check
/// both recipients have room, then credit. Any integrity failure returns
/// `Rejected` without a single `set_inventory` call having happened.
async fn try_swap_once(
    store: &dyn Store,
    catalog: &dyn ItemCatalog,
    a: PlayerId,
    a_offer: &[ItemStack],
    b: PlayerId,
    b_offer: &[ItemStack],
) -> Result<TransactionOutcome, StoreError> {
    let mut a_slots = store.get_inventory(a).await?;
    a_slots.resize(INVENTORY_SLOTS, None);
    let mut b_slots = store.get_inventory(b).await?;
    b_slots.resize(INVENTORY_SLOTS, None);

    if let Err(reason) = verify_and_debit(catalog, &mut a_slots, a_offer) {
        return Ok(TransactionOutcome::Rejected(reason));
    }
    if let Err(reason) = verify_and_debit(catalog, &mut b_slots, b_offer) {
        return Ok(TransactionOutcome::Rejected(reason));
    }

    if !fits(catalog, &a_slots, b_offer) {
        return Ok(TransactionOutcome::Rejected(Reason::InventoryFullInitiator));
    }
    if !fits(catalog, &b_slots, a_offer) {
        return Ok(TransactionOutcome::Rejected(Reason::InventoryFullRecipient));
    }

    for item in b_offer {
        merge_into(catalog, &mut a_slots, *item);
    }
    for item in a_offer {
        merge_into(catalog, &mut b_slots, *item);
    }

    store.set_inventory(a, a_slots).await?;
    store.set_inventory(b, b_slots).await?;
    Ok(TransactionOutcome::Applied)
}

async fn settle_swap(
    store: &dyn Store,
    catalog: &dyn ItemCatalog,
    initiator: PlayerId,
    initiator_offer: Vec<ItemStack>,
    recipient: PlayerId,
    recipient_offer: Vec<ItemStack>,
) -> TransactionOutcome {
    with_both_locked(store, initiator, recipient, || async {
        let mut last_err = None;
        for outer_delay_ms in OUTER_BACKOFF_MS {
            if outer_delay_ms > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(outer_delay_ms)).await;
            }
            match try_swap_once(store, catalog, initiator, &initiator_offer, recipient, &recipient_offer).await {
                Ok(outcome) => return outcome,
                Err(err) if is_transient(&err) => last_err = Some(err),
                Err(err) => return TransactionOutcome::Failed(err),
            }
        }
        TransactionOutcome::Failed(
            last_err.unwrap_or_else(|| StoreError::Backend("transaction retries exhausted".into())),
        )
    })
    .await
}

/// Applies a confirmed trade: each side receives what the other offered,
/// and loses what they offered, re-verified against their live inventory.
pub async fn settle_trade(store: &dyn Store, catalog: &dyn ItemCatalog, ready: TradeReady) -> TransactionOutcome {
    settle_swap(store, catalog, ready.a, ready.a_offer, ready.b, ready.b_offer).await
}

/// One attempt at duel settlement: re-selects the loser's live inventory
/// for each staked item and transfers `min(staked, actualRemaining)`, so a
/// loser who consumed part of their stake mid-duel can't be double-paid
/// out of. The winner's own stake is never touched.
async fn try_settle_duel_once(
    store: &dyn Store,
    catalog: &dyn ItemCatalog,
    winner: PlayerId,
    loser: PlayerId,
    loser_stake: &[ItemStack],
) -> Result<TransactionOutcome, StoreError> {
    let mut loser_slots = store.get_inventory(loser).await?;
    loser_slots.resize(INVENTORY_SLOTS, None);

    let transfer: Vec<ItemStack> = loser_stake
        .iter()
        .map(|stake| ItemStack {
            item_id: stake.item_id,
            quantity: stake.quantity.min(total_quantity(&loser_slots, stake.item_id)),
        })
        .filter(|stack| stack.quantity > 0)
        .collect();

    // Credited before the loser is debited: if the credit fails outright,
    // the loser keeps the stake rather than the items vanishing from both
    // sides.
    let dropped = credit_with_retry(store, catalog, winner, transfer.clone()).await?;

    for item in &transfer {
        debit_from(&mut loser_slots, item.item_id, item.quantity);
    }
    store.set_inventory(loser, loser_slots).await?;

    if dropped.is_empty() {
        Ok(TransactionOutcome::Applied)
    } else {
        Ok(TransactionOutcome::PartialDropped { player: winner, dropped })
    }
}

/// Applies a duel's stake settlement: the winner receives whatever the
/// loser still has of their staked items.
pub async fn settle_duel_stakes(
    store: &dyn Store,
    catalog: &dyn ItemCatalog,
    winner: PlayerId,
    loser: PlayerId,
    loser_stake: Vec<ItemStack>,
) -> TransactionOutcome {
    tracing::info!(%winner, %loser, "settling duel stakes");
    with_both_locked(store, winner, loser, || async {
        let mut last_err = None;
        for outer_delay_ms in OUTER_BACKOFF_MS {
            if outer_delay_ms > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(outer_delay_ms)).await;
            }
            match try_settle_duel_once(store, catalog, winner, loser, &loser_stake).await {
                Ok(outcome) => return outcome,
                Err(err) if is_transient(&err) => last_err = Some(err),
                Err(err) => return TransactionOutcome::Failed(err),
            }
        }
        TransactionOutcome::Failed(
            last_err.unwrap_or_else(|| StoreError::Backend("transaction retries exhausted".into())),
        )
    })
    .await
}

/// Prevents a retried settlement (e.g. after a crash mid-transaction) from
/// crediting the winner twice. Keyed `${winnerId}:${loserId}`, with a TTL
/// measured in ticks so it doesn't grow unbounded.
#[derive(Default)]
pub struct IdempotencyGuard {
    seen: HashMap<String, u64>,
    ttl_ticks: u64,
}

impl IdempotencyGuard {
    pub fn new(ttl_ticks: u64) -> Self {
        IdempotencyGuard { seen: HashMap::new(), ttl_ticks }
    }

    pub fn key(winner: PlayerId, loser: PlayerId) -> String {
        format!("{}:{}", winner.0, loser.0)
    }

    /// Returns `true` the first time `key` is seen within the TTL window;
    /// `false` on a duplicate, meaning the caller should skip settlement.
    pub fn check_and_record(&mut self, key: String, current_tick: u64) -> bool {
        if let Some(expires_at) = self.seen.get(&key)
            && current_tick < *expires_at
        {
            return false;
        }
        self.seen.insert(key, current_tick + self.ttl_ticks);
        true
    }

    pub fn sweep(&mut self, current_tick: u64) {
        self.seen.retain(|_, expires_at| *expires_at > current_tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::PermissiveItemCatalog;
    use crate::store::InMemoryStore;

    fn stack(item_id: u32, quantity: u32) -> ItemStack {
        ItemStack { item_id, quantity }
    }

    fn catalog() -> PermissiveItemCatalog {
        PermissiveItemCatalog
    }

    #[tokio::test]
    async fn trade_swaps_each_sides_offer_and_debits_the_sender() {
        let store = InMemoryStore::new();
        let (a, b) = (PlayerId(1), PlayerId(2));
        store.set_inventory(a, vec![Some(stack(995, 100))]).await.unwrap();
        store.set_inventory(b, vec![Some(stack(1511, 5))]).await.unwrap();
        let ready = TradeReady {
            trade: crate::trading::TradeId(0),
            a,
            a_offer: vec![stack(995, 100)],
            b,
            b_offer: vec![stack(1511, 5)],
        };
        let outcome = settle_trade(&store, &catalog(), ready).await;
        assert!(matches!(outcome, TransactionOutcome::Applied));
        assert_eq!(store.get_inventory(a).await.unwrap()[0], Some(stack(1511, 5)));
        assert_eq!(store.get_inventory(b).await.unwrap()[0], Some(stack(995, 100)));
    }

    #[tokio::test]
    async fn trade_rejects_without_mutating_anything_when_an_offer_no_longer_exists() {
        let store = InMemoryStore::new();
        let (a, b) = (PlayerId(1), PlayerId(2));
        // a claimed 100 coins at negotiation time but has since spent them.
        store.set_inventory(a, vec![Some(stack(995, 10))]).await.unwrap();
        store.set_inventory(b, vec![Some(stack(1511, 5))]).await.unwrap();
        let ready = TradeReady {
            trade: crate::trading::TradeId(0),
            a,
            a_offer: vec![stack(995, 100)],
            b,
            b_offer: vec![stack(1511, 5)],
        };
        let outcome = settle_trade(&store, &catalog(), ready).await;
        assert!(matches!(outcome, TransactionOutcome::Rejected(Reason::ItemChanged)));
        assert_eq!(store.get_inventory(a).await.unwrap()[0], Some(stack(995, 10)));
        assert_eq!(store.get_inventory(b).await.unwrap()[0], Some(stack(1511, 5)));
    }

    #[tokio::test]
    async fn full_inventory_and_bank_drops_the_item() {
        let store = InMemoryStore::new();
        let player = PlayerId(1);
        let full_inventory: Vec<Option<ItemStack>> =
            (0..INVENTORY_SLOTS).map(|i| Some(stack(i as u32 + 1, 1))).collect();
        store.set_inventory(player, full_inventory).await.unwrap();
        store.set_bank(player, vec![vec![Some(stack(9999, 1))]]).await.unwrap();

        let dropped = credit_player(&store, &catalog(), player, vec![stack(500, 1)]).await.unwrap();
        assert_eq!(dropped, vec![stack(500, 1)]);
    }

    #[tokio::test]
    async fn duel_settlement_transfers_only_what_the_loser_still_has() {
        let store = InMemoryStore::new();
        let (winner, loser) = (PlayerId(1), PlayerId(2));
        // Staked 5 shrimp, ate 3 mid-fight; only 2 remain by settlement.
        store.set_inventory(loser, vec![Some(stack(317, 2))]).await.unwrap();

        let outcome =
            settle_duel_stakes(&store, &catalog(), winner, loser, vec![stack(317, 5)]).await;
        assert!(matches!(outcome, TransactionOutcome::Applied));
        assert_eq!(store.get_inventory(winner).await.unwrap()[0], Some(stack(317, 2)));
        assert_eq!(store.get_inventory(loser).await.unwrap()[0], None);
    }

    #[test]
    fn idempotency_guard_rejects_a_duplicate_within_the_ttl() {
        let mut guard = IdempotencyGuard::new(100);
        let key = IdempotencyGuard::key(PlayerId(1), PlayerId(2));
        assert!(guard.check_and_record(key.clone(), 0));
        assert!(!guard.check_and_record(key.clone(), 50));
        assert!(guard.check_and_record(key, 101));
    }
}
