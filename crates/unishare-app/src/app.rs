// Application state and marketplace workflows.
//
// `AppState` owns the store and the AI client. Each workflow is a short
// sequence of store calls; observers registered on the store see every
// intermediate write.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use unishare_ai::{appraise_with_timeout, Assistant, DamageReport, VideoAppraisal};
use unishare_core::config::Config;
use unishare_core::karma::{self, Feedback, NOTE_SHARE_REWARD, STARTING_KARMA};
use unishare_core::models::{Listing, ListingType, Note, TradeStatus, User, SYSTEM_COUNTERPARTY};
use unishare_core::session;
use unishare_core::store::Store;

/// Carbon estimate used when an appraisal did not produce one.
const DEFAULT_CARBON_SAVED: f64 = 0.5;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub config: Config,
    pub store: Store,
    /// Shared with spawned tasks.
    pub ai: Arc<dyn Assistant>,
}

/// Seller-supplied fields for a listing built from an appraisal.
#[derive(Debug, Clone)]
pub struct ListingDraft {
    pub description: String,
    pub listing_type: ListingType,
    /// Asking price. Defaults to the appraised value; ignored for free items.
    pub price: Option<f64>,
    pub price_per_day: Option<f64>,
    pub return_date: Option<String>,
    pub security_deposit: Option<f64>,
    pub department: String,
    pub image_url: String,
    pub scan_video_url: Option<String>,
}

impl AppState {
    pub fn new(config: Config, store: Store, ai: Arc<dyn Assistant>) -> Self {
        Self { config, store, ai }
    }

    fn require_user(&self, uid: &str) -> Result<User> {
        self.store
            .user(uid)?
            .ok_or_else(|| anyhow!("no user with uid {uid}"))
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Sign in with a campus email. A returning user keeps their karma and
    /// profile; a new one starts at the default karma. The user record and
    /// the session slot both receive a fresh token.
    pub fn sign_in(&self, email: &str, name: &str, department: Option<&str>) -> Result<User> {
        if !session::is_campus_email(email) {
            bail!("{email} is not a campus email address");
        }
        let uid = session::uid_for_email(email);

        let mut user = match self.store.user(&uid)? {
            Some(existing) => existing,
            None => {
                info!(%uid, "Creating new account");
                User {
                    uid: uid.clone(),
                    email: email.trim().to_lowercase(),
                    name: name.to_string(),
                    avatar_url: None,
                    department: department.map(str::to_string),
                    class_year: None,
                    roll_number: None,
                    is_logged_in: true,
                    karma: STARTING_KARMA,
                    total_carbon_saved: 0.0,
                    is_verified: true,
                    token: None,
                }
            }
        };
        user.is_logged_in = true;
        user.token = Some(session::issue(&user, Utc::now()));

        self.store.set_session(&user)?;
        self.store.save_user(&user)?;
        info!(%uid, "Signed in");
        Ok(user)
    }

    pub fn sign_out(&self) -> Result<()> {
        if let Some(mut user) = self.store.session()? {
            user.is_logged_in = false;
            user.token = None;
            self.store.clear_session()?;
            self.store.save_user(&user)?;
            info!(uid = %user.uid, "Signed out");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Trades
    // ------------------------------------------------------------------

    pub fn request_trade(&self, item_id: &str, buyer: &str) -> Result<()> {
        self.store
            .set_trade_status(item_id, TradeStatus::Requested, buyer)
    }

    /// Seller accepts. The counterparty is recorded as the system.
    pub fn accept_trade(&self, item_id: &str) -> Result<()> {
        self.store
            .set_trade_status(item_id, TradeStatus::Accepted, SYSTEM_COUNTERPARTY)
    }

    /// Back to active with no counterparty.
    pub fn cancel_trade(&self, item_id: &str) -> Result<()> {
        self.store
            .set_trade_status(item_id, TradeStatus::Active, "")
    }

    /// Mark the exchange completed, then reward `uid` for it. A transition
    /// the trade policy rejects leaves both the record and the user
    /// untouched. The counterparty is recorded as the system.
    pub fn complete_trade(&self, uid: &str, item_id: &str, listing_type: ListingType) -> Result<User> {
        let user = self.require_user(uid)?;
        self.store
            .set_trade_status(item_id, TradeStatus::Completed, SYSTEM_COUNTERPARTY)
            .with_context(|| format!("failed to complete trade {item_id}"))?;

        let (karma_delta, carbon_delta) = karma::completion_reward(listing_type);
        let rewarded = karma::adjusted(&user, karma_delta, carbon_delta);
        self.store.save_user(&rewarded)?;

        info!(uid, item_id, karma = rewarded.karma, "Trade completed");
        Ok(rewarded)
    }

    /// Apply post-deal feedback to the trading partner `uid`.
    pub fn submit_feedback(&self, uid: &str, feedback: Feedback) -> Result<User> {
        let user = self.require_user(uid)?;
        let updated = karma::adjusted(&user, feedback.karma_delta(), 0.0);
        self.store.save_user(&updated)?;
        info!(uid, ?feedback, karma = updated.karma, "Feedback recorded");
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    /// Publish a note and credit its author.
    pub fn share_note(&self, uid: &str, note: Note) -> Result<User> {
        let author = self.require_user(uid)?;
        self.store.create_note(note)?;
        let credited = karma::adjusted(&author, NOTE_SHARE_REWARD, 0.0);
        self.store.save_user(&credited)?;
        Ok(credited)
    }

    /// Generate a summary for a stored note from its PDF and save it on the
    /// note.
    pub async fn summarize_note(&self, note_id: &str, pdf: &str) -> Result<String> {
        let note = self
            .store
            .notes()?
            .into_iter()
            .find(|n| n.id == note_id)
            .ok_or_else(|| anyhow!("no note with id {note_id}"))?;

        let summary = self.ai.summarize_pdf(pdf, &note.title).await?;
        self.store.replace_note(Note {
            summary: Some(summary.clone()),
            ..note
        })?;
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------

    /// Appraise a scan video, giving up after `ai.scan_timeout_secs`.
    pub async fn appraise_scan(&self, video_b64: &str, mime: &str) -> Result<VideoAppraisal> {
        let limit = Duration::from_secs(self.config.ai.scan_timeout_secs);
        let appraisal = appraise_with_timeout(self.ai.as_ref(), video_b64, mime, limit)
            .await
            .inspect_err(|e| warn!(error = %e, "scan appraisal failed"))?;
        Ok(appraisal)
    }

    pub async fn inspect_damage(&self, image_b64: &str) -> Result<DamageReport> {
        Ok(self.ai.inspect_damage(image_b64).await?)
    }

    /// Build a listing from an appraisal and the seller's draft, and
    /// publish it.
    pub fn publish_appraised_listing(
        &self,
        owner: &User,
        appraisal: &VideoAppraisal,
        draft: ListingDraft,
    ) -> Result<Listing> {
        let now = Utc::now();
        let is_rent = draft.listing_type == ListingType::Rent;
        let price = match draft.listing_type {
            ListingType::Free => 0.0,
            _ => draft.price.unwrap_or(appraisal.estimated_price),
        };
        let carbon_saved = if appraisal.carbon_saved > 0.0 {
            appraisal.carbon_saved
        } else {
            DEFAULT_CARBON_SAVED
        };

        let listing = Listing {
            id: format!("listing-{}", now.timestamp_millis()),
            title: appraisal.item_name.clone(),
            description: draft.description,
            price,
            listing_type: draft.listing_type,
            price_per_day: draft.price_per_day.filter(|_| is_rent),
            return_date: draft.return_date.filter(|_| is_rent),
            security_deposit: draft
                .security_deposit
                .filter(|_| draft.listing_type != ListingType::Sell),
            category: appraisal.category(),
            department: draft.department,
            owner: owner.name.clone(),
            owner_email: owner.email.clone(),
            owner_karma: owner.karma,
            image_url: draft.image_url,
            scan_video_url: draft.scan_video_url,
            honest_review: Some(appraisal.review.clone()),
            condition: format!("{} (AI Audited)", appraisal.quality_grade.condition_label()),
            created_at: now,
            carbon_saved,
        };

        self.store.create_listing(listing.clone())?;
        Ok(listing)
    }

    // ------------------------------------------------------------------
    // Assistant passthroughs
    // ------------------------------------------------------------------

    pub async fn support(&self, query: &str) -> Result<String> {
        Ok(self.ai.support_reply(query).await?)
    }

    pub async fn compare_listings(&self, first_id: &str, second_id: &str) -> Result<String> {
        let listings = self.store.listings()?;
        let find = |id: &str| {
            listings
                .iter()
                .find(|l| l.id == id)
                .ok_or_else(|| anyhow!("no listing with id {id}"))
        };
        let (first, second) = (find(first_id)?, find(second_id)?);
        Ok(self.ai.compare_items(first, second).await?)
    }

    /// Explain the current session token's claims. Fails when nobody is
    /// signed in or the token does not decode.
    pub async fn explain_session(&self) -> Result<String> {
        let token = self
            .store
            .session()?
            .and_then(|u| u.token)
            .ok_or_else(|| anyhow!("no active session"))?;
        let decoded = session::decode(&token);
        if !decoded.is_valid {
            bail!("session token is malformed");
        }
        Ok(self.ai.explain_claims(&decoded.payload).await?)
    }
}
