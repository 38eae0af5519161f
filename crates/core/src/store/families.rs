use esfinteres_sheets::{Row, ValueRange};
use uuid::Uuid;

use super::{
    activity_cols, backend, cell, family_cols, format_bool, parse_bool, RecordStore, ACTIVITIES,
    FAMILIES,
};
use crate::error::StoreError;
use crate::model::{normalize_email, same_email, Family, FamilyMember};

fn parse_member(index: usize, row: &Row) -> Option<FamilyMember> {
    let family_id = cell(row, family_cols::FAMILY_ID).trim();
    let member_email = cell(row, family_cols::MEMBER).trim();
    if family_id.is_empty() || !member_email.contains('@') {
        return None;
    }
    Some(FamilyMember {
        row: index as u32 + 1,
        family_id: family_id.to_string(),
        member_email: member_email.to_string(),
        baby_name: cell(row, family_cols::BABY_NAME).to_string(),
        is_owner: parse_bool(cell(row, family_cols::OWNER)),
    })
}

impl RecordStore {
    async fn scan_families(&self) -> Result<Vec<FamilyMember>, StoreError> {
        let rows = self
            .sheets
            .read(&FAMILIES.all())
            .await
            .map_err(backend("scan families"))?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| parse_member(index, row))
            .collect())
    }

    /// The family of the first membership row naming `email`, if any.
    pub async fn find_family_of(&self, email: &str) -> Result<Option<Family>, StoreError> {
        let members = self.scan_families().await?;
        let Some(family_id) = members
            .iter()
            .find(|m| same_email(&m.member_email, email))
            .map(|m| m.family_id.clone())
        else {
            tracing::debug!(email, "no family membership");
            return Ok(None);
        };

        let members = members
            .into_iter()
            .filter(|m| m.family_id == family_id)
            .collect();
        Ok(Some(Family { family_id, members }))
    }

    /// Start a new family with `owner_email` as its only (owner) member.
    pub async fn create_family(
        &self,
        owner_email: &str,
        baby_name: &str,
    ) -> Result<Family, StoreError> {
        let family_id = Uuid::new_v4().to_string();
        self.append_member(&family_id, owner_email, baby_name, true)
            .await?;
        tracing::info!(family_id = %family_id, owner = owner_email, "family created");

        // Re-read to learn the row the backend placed the membership on.
        let members = self
            .scan_families()
            .await?
            .into_iter()
            .filter(|m| m.family_id == family_id)
            .collect();
        Ok(Family { family_id, members })
    }

    /// Append a non-owner membership row.
    pub async fn add_family_member(
        &self,
        family_id: &str,
        email: &str,
        baby_name: &str,
    ) -> Result<(), StoreError> {
        self.append_member(family_id, email, baby_name, false).await?;
        tracing::info!(family_id, member = email, "family member added");
        Ok(())
    }

    async fn append_member(
        &self,
        family_id: &str,
        email: &str,
        baby_name: &str,
        is_owner: bool,
    ) -> Result<(), StoreError> {
        let row = vec![
            family_id.to_string(),
            normalize_email(email),
            baby_name.to_string(),
            format_bool(is_owner),
        ];
        self.sheets
            .append(&FAMILIES.all(), vec![row])
            .await
            .map_err(backend("append family member"))
    }

    /// Write `baby_name` onto every membership row of `family` and onto every
    /// activity row owned by one of its members, as one batched write.
    ///
    /// Returns the number of activity rows renamed.
    pub async fn rename_baby(&self, family: &Family, baby_name: &str) -> Result<usize, StoreError> {
        let emails = family.member_emails();
        let activity_rows: Vec<u32> = self
            .scan_activities()
            .await?
            .into_iter()
            .filter(|s| emails.iter().any(|e| same_email(e, &s.activity.owner_email)))
            .map(|s| s.row)
            .collect();

        let name = vec![vec![baby_name.to_string()]];
        let mut data: Vec<ValueRange> = family
            .members
            .iter()
            .map(|m| ValueRange::new(FAMILIES.cell(family_cols::BABY_NAME, m.row), name.clone()))
            .collect();
        data.extend(activity_rows.iter().map(|row| {
            ValueRange::new(ACTIVITIES.cell(activity_cols::BABY_NAME, *row), name.clone())
        }));

        self.sheets
            .batch_update(data)
            .await
            .map_err(backend("rename baby"))?;

        tracing::info!(
            family_id = %family.family_id,
            members = family.members.len(),
            activities = activity_rows.len(),
            "baby renamed"
        );
        Ok(activity_rows.len())
    }
}
