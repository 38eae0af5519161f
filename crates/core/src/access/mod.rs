//! Access-control gate.
//!
//! A request moves through `Unauthenticated → Authenticated(free) →
//! Authenticated(premium)`. The premium flag is re-read from the Users sheet
//! on every request; whatever the session carried at sign-in is not trusted.

pub mod tier;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AccessError;
use crate::model::{month_start, ActivityQuery};
use crate::store::RecordStore;

pub use tier::{Tier, TierLimits, FREE_MONTHLY_QUOTA, FREE_VISIBILITY_DAYS};

/// Identity carried by a verified session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub email: String,
    pub name: String,
}

/// An authenticated requester with a resolved tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub email: String,
    pub name: String,
    pub tier: Tier,
}

impl Viewer {
    pub fn is_premium(&self) -> bool {
        self.tier == Tier::Premium
    }

    pub fn limits(&self) -> TierLimits {
        self.tier.limits()
    }
}

#[derive(Clone)]
pub struct AccessGate {
    store: RecordStore,
}

impl AccessGate {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Resolve the requester. No session is `Unauthorized`.
    ///
    /// A failed premium lookup degrades to the free tier rather than failing
    /// the request.
    pub async fn authorize(&self, session: Option<&SessionUser>) -> Result<Viewer, AccessError> {
        let session = session.ok_or(AccessError::Unauthorized)?;

        let is_premium = match self.store.check_premium_status(&session.email).await {
            Ok(flag) => flag,
            Err(err) => {
                tracing::warn!(email = %session.email, error = %err, "premium check failed, treating as free");
                false
            }
        };

        Ok(Viewer {
            email: session.email.clone(),
            name: session.name.clone(),
            tier: Tier::from_premium_flag(is_premium),
        })
    }

    /// Family sharing is premium-only.
    pub fn require_family(&self, viewer: &Viewer) -> Result<(), AccessError> {
        if viewer.limits().family_sharing {
            Ok(())
        } else {
            Err(AccessError::PremiumRequired {
                feature: "family sharing",
            })
        }
    }

    /// Check the monthly write quota against a fresh count of the viewer's own
    /// activities. Returns the current count when another write is allowed.
    pub async fn check_write_quota(
        &self,
        viewer: &Viewer,
        now: DateTime<Utc>,
    ) -> Result<usize, AccessError> {
        let limits = viewer.limits();
        let Some(limit) = limits.monthly_quota else {
            return Ok(0);
        };

        let page = self
            .store
            .get_activities(&viewer.email, &ActivityQuery::default(), now)
            .await?;

        if limits.quota_reached(page.monthly_count) {
            tracing::info!(
                email = %viewer.email,
                monthly_count = page.monthly_count,
                limit,
                "monthly quota reached"
            );
            return Err(AccessError::LimitReached {
                monthly_count: page.monthly_count,
                limit,
            });
        }
        Ok(page.monthly_count)
    }

    /// Moving a record's timestamp must not change what the quota counts. Free
    /// viewers may only retime records of the current month, within it.
    pub fn check_retime(
        &self,
        viewer: &Viewer,
        original: DateTime<Utc>,
        new: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), AccessError> {
        if viewer.limits().monthly_quota.is_none() {
            return Ok(());
        }
        let window = month_start(now)..=now;
        if window.contains(&original) && window.contains(&new) {
            Ok(())
        } else {
            Err(AccessError::PremiumRequired {
                feature: "moving records outside the current month",
            })
        }
    }

    /// Narrow a listing to what the viewer's tier may see.
    pub fn scope_query(
        &self,
        viewer: &Viewer,
        query: ActivityQuery,
        now: DateTime<Utc>,
    ) -> ActivityQuery {
        match viewer.limits().visible_since(now) {
            Some(since) => ActivityQuery {
                start_date: Some(query.start_date.map_or(since, |start| start.max(since))),
                ..query
            },
            None => query,
        }
    }
}
