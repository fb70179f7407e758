// Collection store with per-collection change notification.
//
// Every collection lives in one durable slot as a JSON document. Each
// mutation rewrites the whole slot and then hands the complete new
// snapshot to every observer of that collection, synchronously. There is
// no diffing and no batching.
//
// Every mutation is stamped with a store-wide revision taken under the
// write lock. Subscription replays are read under the same lock, and each
// observer drops a snapshot older than one it has already been handed, so
// a replay racing a concurrent write cannot overwrite the newer state.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::db::Database;
use crate::models::{Listing, Note, TradeRecord, TradeStatus, User};
use crate::notify::{Channel, KeyedChannels, Observer, Subscription};
use crate::seed;
use crate::trade::TradePolicy;

// ---------------------------------------------------------------------------
// Slot keys
// ---------------------------------------------------------------------------

pub const LISTINGS_SLOT: &str = "unishare_listings_v2";
pub const NOTES_SLOT: &str = "unishare_notes_v2";
pub const USERS_SLOT: &str = "unishare_users_v3";
pub const TRADES_SLOT: &str = "unishare_trades_v2";
pub const WISHLIST_PREFIX: &str = "unishare_wishlist_v2";
pub const SESSION_SLOT: &str = "user";

/// Slot holding one user's wishlist.
pub fn wishlist_slot(user_id: &str) -> String {
    format!("{WISHLIST_PREFIX}_{user_id}")
}

/// Trade records keyed by listing or note id.
pub type TradeTable = BTreeMap<String, TradeRecord>;

/// User records keyed by uid.
pub type UserTable = BTreeMap<String, User>;

/// A snapshot tagged with the store revision that produced it.
#[derive(Debug, Clone)]
struct Versioned<T> {
    revision: u64,
    value: T,
}

/// Observer callback that takes the snapshot's revision alongside it.
type Gated<T> = Arc<dyn Fn(u64, &T) + Send + Sync>;

/// Wrap `deliver` so it is never handed a snapshot older than, or equal
/// to, one it already received.
fn in_order<T, F>(deliver: F) -> Gated<T>
where
    T: 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    // One past the newest revision admitted so far.
    let seen = AtomicU64::new(0);
    Arc::new(move |revision: u64, value: &T| {
        if seen.fetch_max(revision + 1, Ordering::AcqRel) <= revision {
            deliver(value);
        }
    })
}

/// Adapt a gated callback to a channel observer.
fn forward<T: 'static>(gate: &Gated<T>) -> Observer<Versioned<T>> {
    let gate = Arc::clone(gate);
    Arc::new(move |snapshot: &Versioned<T>| gate(snapshot.revision, &snapshot.value))
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Durable collections plus their observer channels. One instance is owned
/// by the application root and shared by reference.
pub struct Store {
    db: Database,
    policy: TradePolicy,
    /// Serializes read-modify-write cycles within this store. Observers are
    /// always notified after it is released.
    write_lock: Mutex<()>,
    /// Count of notifying mutations. Only advanced under `write_lock`.
    revision: AtomicU64,
    listings: Channel<Versioned<Vec<Listing>>>,
    notes: Channel<Versioned<Vec<Note>>>,
    trades: Channel<Versioned<TradeTable>>,
    users: KeyedChannels<Versioned<Option<User>>>,
    wishlists: KeyedChannels<Versioned<Vec<String>>>,
}

impl Store {
    pub fn new(db: Database, policy: TradePolicy) -> Self {
        Self {
            db,
            policy,
            write_lock: Mutex::new(()),
            revision: AtomicU64::new(0),
            listings: Channel::new("listings"),
            notes: Channel::new("notes"),
            trades: Channel::new("trades"),
            users: KeyedChannels::new("users"),
            wishlists: KeyedChannels::new("wishlists"),
        }
    }

    /// Open the database named by the config and apply its trade policy
    /// and slot quota.
    pub fn open(config: &Config) -> Result<Self> {
        let db = Database::open(&config.storage.path)?
            .with_slot_quota(config.storage.max_slot_bytes);
        Ok(Self::new(db, config.trade.policy))
    }

    /// An empty in-memory store.
    pub fn in_memory(policy: TradePolicy) -> Result<Self> {
        Ok(Self::new(Database::open(":memory:")?, policy))
    }

    pub fn policy(&self) -> TradePolicy {
        self.policy
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().expect("store write lock poisoned")
    }

    /// Stamp `value` with the next revision. Call with the write lock held.
    fn stamp<T>(&self, value: T) -> Versioned<T> {
        Versioned {
            revision: self.revision.fetch_add(1, Ordering::AcqRel) + 1,
            value,
        }
    }

    /// Read a replay snapshot consistent with the latest revision.
    fn replay<T>(&self, read: impl FnOnce() -> Result<T>) -> Result<Versioned<T>> {
        let _guard = self.write_guard();
        Ok(Versioned {
            revision: self.revision.load(Ordering::Acquire),
            value: read()?,
        })
    }

    /// Seed empty collections. Slots that already hold data are left alone.
    pub fn init(&self) -> Result<()> {
        let _guard = self.write_guard();
        if self.db.read_slot(LISTINGS_SLOT)?.is_none() {
            self.db.save_json(LISTINGS_SLOT, &seed::listings())?;
            info!("Seeded listings collection");
        }
        if self.db.read_slot(NOTES_SLOT)?.is_none() {
            self.db.save_json(NOTES_SLOT, &seed::notes())?;
            info!("Seeded notes collection");
        }
        if self.db.read_slot(USERS_SLOT)?.is_none() {
            self.db.save_json(USERS_SLOT, &UserTable::new())?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------

    /// All listings, newest first. Empty if the collection was never written.
    pub fn listings(&self) -> Result<Vec<Listing>> {
        Ok(self.db.load_json(LISTINGS_SLOT)?.unwrap_or_default())
    }

    /// Prepend `listing` and notify listings observers. Ids are not checked
    /// for uniqueness.
    pub fn create_listing(&self, listing: Listing) -> Result<()> {
        let snapshot = {
            let _guard = self.write_guard();
            let mut all = self.listings()?;
            info!(id = %listing.id, title = %listing.title, "Creating listing");
            all.insert(0, listing);
            self.db.save_json(LISTINGS_SLOT, &all)?;
            self.stamp(all)
        };
        self.listings.notify(&snapshot);
        Ok(())
    }

    /// Replace the first listing with the same id by `listing`. Returns
    /// `false` (and notifies nobody) when no listing has that id.
    pub fn replace_listing(&self, listing: Listing) -> Result<bool> {
        let snapshot = {
            let _guard = self.write_guard();
            let mut all = self.listings()?;
            let Some(slot) = all.iter_mut().find(|l| l.id == listing.id) else {
                return Ok(false);
            };
            *slot = listing;
            self.db.save_json(LISTINGS_SLOT, &all)?;
            self.stamp(all)
        };
        self.listings.notify(&snapshot);
        Ok(true)
    }

    /// Register a listings observer. It receives the current snapshot
    /// before this returns, then one snapshot per mutation.
    pub fn subscribe_listings<F>(&self, observer: F) -> Result<Subscription>
    where
        F: Fn(&[Listing]) + Send + Sync + 'static,
    {
        let gate = in_order(move |all: &Vec<Listing>| observer(all.as_slice()));
        let sub = self.listings.register(forward(&gate));
        let current = self.replay(|| self.listings())?;
        gate(current.revision, &current.value);
        Ok(sub)
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    pub fn notes(&self) -> Result<Vec<Note>> {
        Ok(self.db.load_json(NOTES_SLOT)?.unwrap_or_default())
    }

    pub fn create_note(&self, note: Note) -> Result<()> {
        let snapshot = {
            let _guard = self.write_guard();
            let mut all = self.notes()?;
            info!(id = %note.id, title = %note.title, "Creating note");
            all.insert(0, note);
            self.db.save_json(NOTES_SLOT, &all)?;
            self.stamp(all)
        };
        self.notes.notify(&snapshot);
        Ok(())
    }

    pub fn replace_note(&self, note: Note) -> Result<bool> {
        let snapshot = {
            let _guard = self.write_guard();
            let mut all = self.notes()?;
            let Some(slot) = all.iter_mut().find(|n| n.id == note.id) else {
                return Ok(false);
            };
            *slot = note;
            self.db.save_json(NOTES_SLOT, &all)?;
            self.stamp(all)
        };
        self.notes.notify(&snapshot);
        Ok(true)
    }

    /// Register a notes observer. With `department` set, the observer only
    /// ever sees notes from that department.
    pub fn subscribe_notes<F>(&self, observer: F, department: Option<&str>) -> Result<Subscription>
    where
        F: Fn(&[Note]) + Send + Sync + 'static,
    {
        let department = department.map(str::to_string);
        let gate = in_order(move |all: &Vec<Note>| match &department {
            Some(dept) => observer(crate::catalog::notes_in_department(all, dept).as_slice()),
            None => observer(all.as_slice()),
        });
        let sub = self.notes.register(forward(&gate));
        let current = self.replay(|| self.notes())?;
        gate(current.revision, &current.value);
        Ok(sub)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub fn users(&self) -> Result<UserTable> {
        Ok(self.db.load_json(USERS_SLOT)?.unwrap_or_default())
    }

    pub fn user(&self, uid: &str) -> Result<Option<User>> {
        Ok(self.users()?.remove(uid))
    }

    /// Overwrite the stored record for `user.uid` (no merge) and notify that
    /// user's observers. The session copy is refreshed when it belongs to
    /// the same uid.
    pub fn save_user(&self, user: &User) -> Result<()> {
        let snapshot = {
            let _guard = self.write_guard();
            let mut users = self.users()?;
            users.insert(user.uid.clone(), user.clone());
            self.db.save_json(USERS_SLOT, &users)?;

            let session: Option<User> = self.db.load_json(SESSION_SLOT)?;
            if session.is_some_and(|s| s.uid == user.uid) {
                self.db.save_json(SESSION_SLOT, user)?;
                debug!(uid = %user.uid, "session copy refreshed");
            }
            info!(uid = %user.uid, karma = user.karma, "Saved user");
            self.stamp(Some(user.clone()))
        };
        self.users.notify(&user.uid, &snapshot);
        Ok(())
    }

    pub fn subscribe_user<F>(&self, uid: &str, observer: F) -> Result<Subscription>
    where
        F: Fn(Option<&User>) + Send + Sync + 'static,
    {
        let gate = in_order(move |user: &Option<User>| observer(user.as_ref()));
        let sub = self.users.register(uid, forward(&gate));
        let current = self.replay(|| self.user(uid))?;
        gate(current.revision, &current.value);
        Ok(sub)
    }

    // ------------------------------------------------------------------
    // Session slot
    // ------------------------------------------------------------------

    /// The signed-in user, if any.
    pub fn session(&self) -> Result<Option<User>> {
        self.db.load_json(SESSION_SLOT)
    }

    pub fn set_session(&self, user: &User) -> Result<()> {
        self.db.save_json(SESSION_SLOT, user)
    }

    pub fn clear_session(&self) -> Result<()> {
        self.db.remove_slot(SESSION_SLOT)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Trades
    // ------------------------------------------------------------------

    pub fn trades(&self) -> Result<TradeTable> {
        Ok(self.db.load_json(TRADES_SLOT)?.unwrap_or_default())
    }

    /// Point lookup of an item's trade record.
    pub fn trade_status(&self, id: &str) -> Result<Option<TradeRecord>> {
        Ok(self.trades()?.remove(id))
    }

    /// Upsert the trade record for `id` and notify trade observers. Under
    /// the strict policy an out-of-order transition fails with
    /// [`crate::trade::TradeError`] and nothing is written.
    pub fn set_trade_status(&self, id: &str, status: TradeStatus, counterparty: &str) -> Result<()> {
        let snapshot = {
            let _guard = self.write_guard();
            let mut trades = self.trades()?;
            let current = trades.get(id).map(|r| r.status);
            self.policy.check(id, current, status)?;

            trades.insert(
                id.to_string(),
                TradeRecord {
                    status,
                    buyer_id: counterparty.to_string(),
                },
            );
            self.db
                .save_json(TRADES_SLOT, &trades)
                .with_context(|| format!("failed to record trade status for {id}"))?;
            info!(
                id,
                from = current.map_or("none", |s| s.as_str()),
                to = %status,
                counterparty,
                "Trade status updated"
            );
            self.stamp(trades)
        };
        self.trades.notify(&snapshot);
        Ok(())
    }

    pub fn subscribe_trades<F>(&self, observer: F) -> Result<Subscription>
    where
        F: Fn(&TradeTable) + Send + Sync + 'static,
    {
        let gate = in_order::<TradeTable, _>(observer);
        let sub = self.trades.register(forward(&gate));
        let current = self.replay(|| self.trades())?;
        gate(current.revision, &current.value);
        Ok(sub)
    }

    // ------------------------------------------------------------------
    // Wishlists
    // ------------------------------------------------------------------

    /// Listing ids on a user's wishlist, in the order they were added.
    pub fn wishlist(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self.db.load_json(&wishlist_slot(user_id))?.unwrap_or_default())
    }

    /// Remove `listing` from the wishlist if present, append it otherwise.
    /// Returns whether the listing is on the wishlist afterwards.
    pub fn toggle_wishlist(&self, user_id: &str, listing: &Listing) -> Result<bool> {
        let (snapshot, added) = {
            let _guard = self.write_guard();
            let mut ids = self.wishlist(user_id)?;
            let added = match ids.iter().position(|id| *id == listing.id) {
                Some(index) => {
                    ids.remove(index);
                    false
                }
                None => {
                    ids.push(listing.id.clone());
                    true
                }
            };
            self.db.save_json(&wishlist_slot(user_id), &ids)?;
            debug!(user_id, listing = %listing.id, added, "wishlist toggled");
            (self.stamp(ids), added)
        };
        self.wishlists.notify(user_id, &snapshot);
        Ok(added)
    }

    pub fn subscribe_wishlist<F>(&self, user_id: &str, observer: F) -> Result<Subscription>
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        let gate = in_order(move |ids: &Vec<String>| observer(ids.as_slice()));
        let sub = self.wishlists.register(user_id, forward(&gate));
        let current = self.replay(|| self.wishlist(user_id))?;
        gate(current.revision, &current.value);
        Ok(sub)
    }
}
