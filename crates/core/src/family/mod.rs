//! Family sharing resolver.
//!
//! Joins the Families table against Activities so every member of a family
//! sees the union of all members' activities, and keeps the denormalized baby
//! name consistent across both tables.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::{ActivityPage, ActivityQuery, Family, FamilyInfo, DEFAULT_BABY_NAME};
use crate::store::RecordStore;

#[derive(Clone)]
pub struct FamilyResolver {
    store: RecordStore,
}

impl FamilyResolver {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Membership lookup. Never creates a family.
    pub async fn family_of(&self, email: &str) -> Result<Option<Family>, StoreError> {
        self.store.find_family_of(email).await
    }

    /// The user's family, starting one with them as sole owner when absent.
    pub async fn get_or_create_family(&self, email: &str) -> Result<Family, StoreError> {
        match self.store.find_family_of(email).await? {
            Some(family) => Ok(family),
            None => self.store.create_family(email, DEFAULT_BABY_NAME).await,
        }
    }

    pub async fn family_info(&self, email: &str) -> Result<FamilyInfo, StoreError> {
        let family = self.get_or_create_family(email).await?;
        Ok(FamilyInfo::for_member(&family, email))
    }

    /// Baby name to stamp on a new activity of `email`.
    pub async fn baby_name_for(&self, email: &str) -> Result<String, StoreError> {
        Ok(self
            .family_of(email)
            .await?
            .map(|family| family.canonical_baby_name().to_string())
            .unwrap_or_else(|| DEFAULT_BABY_NAME.to_string()))
    }

    /// Activities of every member of the user's family, newest first, with
    /// `monthly_count` taken over the whole family. Users outside any family
    /// get their own activities.
    pub async fn shared_activities(
        &self,
        email: &str,
        query: &ActivityQuery,
        now: DateTime<Utc>,
    ) -> Result<ActivityPage, StoreError> {
        let owners = match self.family_of(email).await? {
            Some(family) => family.member_emails(),
            None => vec![email.to_string()],
        };
        self.store
            .get_activities_for_owners(&owners, query, now)
            .await
    }

    /// Rename the family's baby on every membership row and on every activity
    /// owned by a member. Returns the family as it reads afterwards.
    pub async fn update_baby_name(
        &self,
        email: &str,
        baby_name: &str,
    ) -> Result<FamilyInfo, StoreError> {
        let baby_name = baby_name.trim();
        if baby_name.is_empty() {
            return Err(StoreError::InvalidInput("baby name must not be empty".into()));
        }

        let family = self.get_or_create_family(email).await?;
        self.store.rename_baby(&family, baby_name).await?;

        let renamed = Family {
            members: family
                .members
                .into_iter()
                .map(|mut member| {
                    member.baby_name = baby_name.to_string();
                    member
                })
                .collect(),
            ..family
        };
        Ok(FamilyInfo::for_member(&renamed, email))
    }

    /// Add `invitee` to the inviter's family. Access is immediate.
    pub async fn invite(&self, inviter: &str, invitee: &str) -> Result<FamilyInfo, StoreError> {
        let invitee = invitee.trim();
        if !invitee.contains('@') {
            return Err(StoreError::InvalidInput(format!(
                "'{invitee}' is not an email address"
            )));
        }

        if self.store.get_user_by_email(invitee).await?.is_none() {
            tracing::info!(inviter, invitee, "invitee has no account");
            return Err(StoreError::InviteeNotRegistered(invitee.to_string()));
        }

        let mut family = self.get_or_create_family(inviter).await?;
        if family.contains(invitee) {
            return Err(StoreError::AlreadyMember(invitee.to_string()));
        }

        let baby_name = family.canonical_baby_name().to_string();
        self.store
            .add_family_member(&family.family_id, invitee, &baby_name)
            .await?;

        // Re-read so the returned member list reflects the appended row.
        if let Some(updated) = self.store.find_family_of(inviter).await? {
            family = updated;
        }
        Ok(FamilyInfo::for_member(&family, inviter))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::model::{ActivityType, NewActivity, NewUser};
    use crate::store::test_support::{at, memory_store};

    async fn register(store: &RecordStore, email: &str) {
        store
            .save_user(&NewUser {
                email: email.to_string(),
                name: email.split('@').next().unwrap_or_default().to_string(),
                image: None,
                is_premium: true,
            })
            .await
            .unwrap();
    }

    async fn log(store: &RecordStore, email: &str, ts: DateTime<Utc>) {
        store
            .save_activity(&NewActivity {
                owner_email: email.to_string(),
                baby_name: "Bebé".to_string(),
                activity_type: ActivityType::Esfinteres,
                details: json!({ "result": "popo" }),
                timestamp: ts,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reads_never_create_a_family() {
        let (store, book) = memory_store();
        let resolver = FamilyResolver::new(store);

        assert!(resolver.family_of("ana@example.com").await.unwrap().is_none());
        assert_eq!(
            resolver.baby_name_for("ana@example.com").await.unwrap(),
            DEFAULT_BABY_NAME
        );
        resolver
            .shared_activities("ana@example.com", &ActivityQuery::default(), Utc::now())
            .await
            .unwrap();
        assert!(book.dump("Families").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn family_info_creates_lazily_with_sole_owner() {
        let (store, _) = memory_store();
        let resolver = FamilyResolver::new(store);

        let info = resolver.family_info("ana@example.com").await.unwrap();
        assert!(info.is_owner);
        assert!(info.shared_users.is_empty());
        assert_eq!(info.baby_name, DEFAULT_BABY_NAME);

        let again = resolver.family_info("ana@example.com").await.unwrap();
        assert_eq!(again.family_id, info.family_id);
    }

    #[tokio::test]
    async fn rename_reaches_every_member_row_and_activity() {
        let (store, book) = memory_store();
        let resolver = FamilyResolver::new(store.clone());
        register(&store, "ana@example.com").await;
        register(&store, "beto@example.com").await;
        register(&store, "carla@example.com").await;

        resolver.invite("ana@example.com", "beto@example.com").await.unwrap();

        let base = at(2025, 3, 10, 8);
        for i in 0..3 {
            log(&store, "ana@example.com", base + Duration::hours(i)).await;
        }
        for i in 0..2 {
            log(&store, "beto@example.com", base + Duration::hours(10 + i)).await;
        }
        log(&store, "carla@example.com", base).await;

        let info = resolver
            .update_baby_name("beto@example.com", "Lola")
            .await
            .unwrap();
        assert_eq!(info.baby_name, "Lola");

        let families = book.dump("Families").await.unwrap();
        assert_eq!(families.len(), 2);
        assert!(families.iter().all(|row| row[2] == "Lola"));

        let activities = book.dump("Activities").await.unwrap();
        let renamed = activities.iter().filter(|row| row[2] == "Lola").count();
        assert_eq!(renamed, 5);
        let untouched = activities
            .iter()
            .find(|row| row[1] == "carla@example.com")
            .unwrap();
        assert_eq!(untouched[2], "Bebé");

        assert_eq!(resolver.baby_name_for("ana@example.com").await.unwrap(), "Lola");
    }

    #[tokio::test]
    async fn empty_baby_name_is_rejected() {
        let (store, _) = memory_store();
        let resolver = FamilyResolver::new(store);
        let err = resolver
            .update_baby_name("ana@example.com", "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn invite_requires_registered_invitee_once() {
        let (store, _) = memory_store();
        let resolver = FamilyResolver::new(store.clone());
        register(&store, "ana@example.com").await;

        let err = resolver
            .invite("ana@example.com", "beto@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invitee-not-registered");

        register(&store, "beto@example.com").await;
        let info = resolver
            .invite("ana@example.com", "beto@example.com")
            .await
            .unwrap();
        assert_eq!(info.shared_users, vec!["beto@example.com".to_string()]);

        let err = resolver
            .invite("ana@example.com", "BETO@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "already-member");

        let family = resolver.family_of("ana@example.com").await.unwrap().unwrap();
        assert_eq!(family.members.len(), 2);
    }

    #[tokio::test]
    async fn members_see_each_others_activities() {
        let (store, _) = memory_store();
        let resolver = FamilyResolver::new(store.clone());
        register(&store, "ana@example.com").await;
        register(&store, "beto@example.com").await;
        resolver.invite("ana@example.com", "beto@example.com").await.unwrap();

        let now = at(2025, 3, 20, 12);
        log(&store, "ana@example.com", at(2025, 3, 2, 9)).await;
        log(&store, "beto@example.com", at(2025, 3, 5, 9)).await;
        log(&store, "ana@example.com", at(2025, 2, 25, 9)).await;

        let page = resolver
            .shared_activities("beto@example.com", &ActivityQuery::default(), now)
            .await
            .unwrap();
        assert_eq!(page.activities.len(), 3);
        assert_eq!(page.monthly_count, 2);
        assert_eq!(page.activities[0].owner_email, "beto@example.com");
        assert_eq!(page.activities[1].owner_email, "ana@example.com");
    }
}
