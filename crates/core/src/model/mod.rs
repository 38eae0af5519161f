pub mod activity;
pub mod family;
pub mod user;

pub use activity::{
    format_timestamp, month_start, parse_timestamp, Activity, ActivityPage, ActivityQuery,
    ActivityType, ActivityUpdate, NewActivity, UnknownActivityType, DEFAULT_BABY_NAME,
};
pub use family::{Family, FamilyInfo, FamilyMember};
pub use user::{
    normalize_email, same_email, NewUser, User, UserRecord, UserUpdate, DEFAULT_COUNTRY,
    DEFAULT_USER_NAME,
};
