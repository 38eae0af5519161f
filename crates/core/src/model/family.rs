use serde::Serialize;

use super::activity::DEFAULT_BABY_NAME;
use super::user::same_email;

/// One membership row of the Families table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyMember {
    /// 1-based sheet row.
    pub row: u32,
    pub family_id: String,
    pub member_email: String,
    pub baby_name: String,
    pub is_owner: bool,
}

/// All membership rows sharing one family id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Family {
    pub family_id: String,
    pub members: Vec<FamilyMember>,
}

impl Family {
    /// The family's baby name: the owner's row when it has one, otherwise the
    /// first non-empty name among members, otherwise the default.
    pub fn canonical_baby_name(&self) -> &str {
        let owner_name = self
            .members
            .iter()
            .find(|m| m.is_owner)
            .map(|m| m.baby_name.trim())
            .filter(|name| !name.is_empty());

        owner_name
            .or_else(|| {
                self.members
                    .iter()
                    .map(|m| m.baby_name.trim())
                    .find(|name| !name.is_empty())
            })
            .unwrap_or(DEFAULT_BABY_NAME)
    }

    pub fn contains(&self, email: &str) -> bool {
        self.members.iter().any(|m| same_email(&m.member_email, email))
    }

    pub fn is_owner(&self, email: &str) -> bool {
        self.members
            .iter()
            .any(|m| m.is_owner && same_email(&m.member_email, email))
    }

    /// Distinct member emails in row order.
    pub fn member_emails(&self) -> Vec<String> {
        let mut emails: Vec<String> = Vec::with_capacity(self.members.len());
        for member in &self.members {
            if !emails.iter().any(|e| same_email(e, &member.member_email)) {
                emails.push(member.member_email.clone());
            }
        }
        emails
    }
}

/// Family summary returned to a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyInfo {
    pub family_id: String,
    pub baby_name: String,
    /// The other members' emails.
    pub shared_users: Vec<String>,
    pub is_owner: bool,
}

impl FamilyInfo {
    pub fn for_member(family: &Family, email: &str) -> Self {
        Self {
            family_id: family.family_id.clone(),
            baby_name: family.canonical_baby_name().to_string(),
            shared_users: family
                .member_emails()
                .into_iter()
                .filter(|e| !same_email(e, email))
                .collect(),
            is_owner: family.is_owner(email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(row: u32, email: &str, baby: &str, owner: bool) -> FamilyMember {
        FamilyMember {
            row,
            family_id: "fam-1".into(),
            member_email: email.into(),
            baby_name: baby.into(),
            is_owner: owner,
        }
    }

    #[test]
    fn canonical_name_prefers_owner_row() {
        let family = Family {
            family_id: "fam-1".into(),
            members: vec![
                member(2, "b@x.com", "Lolita", false),
                member(3, "a@x.com", "Lola", true),
            ],
        };
        assert_eq!(family.canonical_baby_name(), "Lola");
    }

    #[test]
    fn canonical_name_falls_back_to_first_named_member() {
        let family = Family {
            family_id: "fam-1".into(),
            members: vec![
                member(2, "a@x.com", "", true),
                member(3, "b@x.com", "", false),
                member(4, "c@x.com", "Juan", false),
            ],
        };
        assert_eq!(family.canonical_baby_name(), "Juan");

        let unnamed = Family {
            family_id: "fam-1".into(),
            members: vec![member(2, "a@x.com", " ", false)],
        };
        assert_eq!(unnamed.canonical_baby_name(), DEFAULT_BABY_NAME);
    }

    #[test]
    fn info_lists_other_members_only() {
        let family = Family {
            family_id: "fam-1".into(),
            members: vec![
                member(2, "a@x.com", "Lola", true),
                member(3, "b@x.com", "Lola", false),
                member(4, "B@x.com", "Lola", false),
            ],
        };
        let info = FamilyInfo::for_member(&family, "a@x.com");
        assert_eq!(info.shared_users, vec!["b@x.com".to_string()]);
        assert!(info.is_owner);

        let info = FamilyInfo::for_member(&family, "b@x.com");
        assert_eq!(info.shared_users, vec!["a@x.com".to_string()]);
        assert!(!info.is_owner);
    }
}
