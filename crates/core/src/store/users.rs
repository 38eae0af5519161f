use chrono::Utc;
use esfinteres_sheets::Row;

use super::{backend, cell, format_bool, parse_bool, user_cols, RecordStore, USERS};
use crate::error::StoreError;
use crate::model::{
    format_timestamp, normalize_email, parse_timestamp, same_email, NewUser, User, UserRecord,
    UserUpdate, DEFAULT_COUNTRY,
};

fn parse_user(row: &Row) -> Option<User> {
    let email = cell(row, user_cols::EMAIL).trim();
    if email.is_empty() || !email.contains('@') {
        return None;
    }
    let image = cell(row, user_cols::IMAGE).trim();
    Some(User {
        email: email.to_string(),
        name: cell(row, user_cols::NAME).to_string(),
        image: (!image.is_empty()).then(|| image.to_string()),
        is_premium: parse_bool(cell(row, user_cols::PREMIUM)),
        country: cell(row, user_cols::COUNTRY).to_string(),
        created_at: parse_timestamp(cell(row, user_cols::TIMESTAMP)),
    })
}

impl RecordStore {
    /// Append a user row. Does not check for an existing row with the same email.
    pub async fn save_user(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let user = User {
            email: normalize_email(&new_user.email),
            name: new_user.name.clone(),
            image: new_user.image.clone().filter(|i| !i.is_empty()),
            is_premium: new_user.is_premium,
            country: DEFAULT_COUNTRY.to_string(),
            created_at: Some(Utc::now()),
        };

        let row = vec![
            user.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
            user.email.clone(),
            user.name.clone(),
            user.image.clone().unwrap_or_default(),
            format_bool(user.is_premium),
            user.country.clone(),
        ];
        self.sheets
            .append(&USERS.all(), vec![row])
            .await
            .map_err(backend("save user"))?;

        tracing::info!(email = %user.email, "user saved");
        Ok(user)
    }

    /// First user row matching `email`, with its row number.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let rows = self
            .sheets
            .read(&USERS.all())
            .await
            .map_err(backend("get user"))?;

        let found = rows.iter().enumerate().find_map(|(index, row)| {
            parse_user(row)
                .filter(|user| same_email(&user.email, email))
                .map(|user| UserRecord {
                    row: index as u32 + 1,
                    user,
                })
        });

        tracing::debug!(email, found = found.is_some(), "user lookup");
        Ok(found)
    }

    /// Premium flag of the first matching row; `false` when the user is unknown.
    pub async fn check_premium_status(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self
            .get_user_by_email(email)
            .await?
            .map(|record| record.user.is_premium)
            .unwrap_or(false))
    }

    /// Apply a partial update, one single-cell write per changed field.
    pub async fn update_user(&self, email: &str, update: &UserUpdate) -> Result<User, StoreError> {
        let UserRecord { row, mut user } = self
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| StoreError::UserNotFound(email.to_string()))?;

        let mut writes: Vec<(u32, String)> = Vec::new();
        if let Some(name) = &update.name {
            user.name = name.clone();
            writes.push((user_cols::NAME, name.clone()));
        }
        if let Some(image) = &update.image {
            user.image = (!image.is_empty()).then(|| image.clone());
            writes.push((user_cols::IMAGE, image.clone()));
        }
        if let Some(is_premium) = update.is_premium {
            user.is_premium = is_premium;
            writes.push((user_cols::PREMIUM, format_bool(is_premium)));
        }
        if let Some(country) = &update.country {
            user.country = country.clone();
            writes.push((user_cols::COUNTRY, country.clone()));
        }

        for (column, value) in writes {
            self.sheets
                .update(&USERS.cell(column, row), vec![vec![value]])
                .await
                .map_err(backend("update user"))?;
        }

        tracing::info!(email, row, "user updated");
        Ok(user)
    }

    /// Flip the premium flag on. The payment step that triggers it lives elsewhere.
    pub async fn upgrade_to_premium(&self, email: &str) -> Result<User, StoreError> {
        let update = UserUpdate {
            is_premium: Some(true),
            ..Default::default()
        };
        self.update_user(email, &update).await
    }
}
