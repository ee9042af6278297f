use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const USERNAME_CHANGE_COOLDOWN_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub university: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub is_admin: bool,
    pub is_verified: bool,
    pub verification_type: Option<String>,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub ban_appeal_reason: Option<String>,
    pub ban_expires_at: Option<String>,
    pub last_username_change: Option<String>,
    pub created_at: String,
}

impl User {
    /// Username changes are rate-limited to one per week.
    pub fn can_change_username(&self) -> bool {
        match self.last_changed() {
            Some(changed) => Utc::now() > changed + Duration::days(USERNAME_CHANGE_COOLDOWN_DAYS),
            None => true,
        }
    }

    pub fn days_until_username_change(&self) -> i64 {
        match self.last_changed() {
            Some(changed) => {
                let until = changed + Duration::days(USERNAME_CHANGE_COOLDOWN_DAYS) - Utc::now();
                if until.num_seconds() <= 0 {
                    0
                } else {
                    until.num_days() + 1
                }
            }
            None => 0,
        }
    }

    fn last_changed(&self) -> Option<DateTime<Utc>> {
        self.last_username_change
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub body: String,
    pub category: PostCategory,
    pub view_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub body: String,
    pub parent_id: Option<String>,
    pub created_at: String,
}

/// Post categories form a closed set; unknown slugs are rejected at the
/// boundary rather than coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostCategory {
    General,
    Question,
    Advice,
    Experience,
}

impl PostCategory {
    pub const ALL: [PostCategory; 4] = [
        PostCategory::General,
        PostCategory::Question,
        PostCategory::Advice,
        PostCategory::Experience,
    ];

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "general" => Some(PostCategory::General),
            "question" => Some(PostCategory::Question),
            "advice" => Some(PostCategory::Advice),
            "experience" => Some(PostCategory::Experience),
            _ => None,
        }
    }

    pub fn as_slug(&self) -> &'static str {
        match self {
            PostCategory::General => "general",
            PostCategory::Question => "question",
            PostCategory::Advice => "advice",
            PostCategory::Experience => "experience",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PostCategory::General => "General",
            PostCategory::Question => "Q&A",
            PostCategory::Advice => "Advice",
            PostCategory::Experience => "Experience",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "up" => Some(VoteDirection::Up),
            "down" => Some(VoteDirection::Down),
            _ => None,
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

/// Academic annotations on a post. The realism score carries a 1-10 value;
/// the other two are presence flags that toggle off on resubmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcademicFeatureType {
    RealismScore,
    IsExperience,
    IsWishKnew,
}

impl AcademicFeatureType {
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "realism_score" => Some(AcademicFeatureType::RealismScore),
            "is_experience" => Some(AcademicFeatureType::IsExperience),
            "is_wish_knew" => Some(AcademicFeatureType::IsWishKnew),
            _ => None,
        }
    }

    pub fn as_slug(&self) -> &'static str {
        match self {
            AcademicFeatureType::RealismScore => "realism_score",
            AcademicFeatureType::IsExperience => "is_experience",
            AcademicFeatureType::IsWishKnew => "is_wish_knew",
        }
    }

    pub fn is_flag(&self) -> bool {
        matches!(
            self,
            AcademicFeatureType::IsExperience | AcademicFeatureType::IsWishKnew
        )
    }
}
