use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::mentors::{InsertMentorEntity, MentorEntity, UpdateMentorEntity};

/// Public mentor card. Email and account linkage stay private.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MentorDto {
    pub id: Uuid,
    pub name: String,
    pub role: Option<String>,
    pub college: String,
    pub price: i32,
    pub bio: Option<String>,
    pub expertise: Vec<String>,
    pub image_url: Option<String>,
}

impl From<MentorEntity> for MentorDto {
    fn from(value: MentorEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            role: value.role,
            college: value.college,
            price: value.price,
            bio: value.bio,
            expertise: value.expertise,
            image_url: value.image_url,
        }
    }
}

/// Admin view, includes contact and meeting details.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminMentorDto {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub college: String,
    pub price: i32,
    pub bio: Option<String>,
    pub expertise: Vec<String>,
    pub meet_link: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
}

impl From<MentorEntity> for AdminMentorDto {
    fn from(value: MentorEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
            email: value.email,
            role: value.role,
            college: value.college,
            price: value.price,
            bio: value.bio,
            expertise: value.expertise,
            meet_link: value.meet_link,
            image_url: value.image_url,
            is_active: value.is_active,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMentorRequest {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub college: String,
    pub price: i32,
    pub bio: Option<String>,
    #[serde(default)]
    pub expertise: Vec<String>,
    pub meet_link: Option<String>,
    pub image_url: Option<String>,
}

impl CreateMentorRequest {
    pub fn to_entity(self) -> InsertMentorEntity {
        InsertMentorEntity {
            user_id: self.user_id,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_ascii_lowercase(),
            role: self.role,
            college: self.college.trim().to_string(),
            price: self.price,
            bio: self.bio,
            expertise: self.expertise,
            meet_link: self.meet_link,
            image_url: self.image_url,
            is_active: true,
        }
    }
}

/// Admin patch. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMentorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub college: Option<String>,
    pub price: Option<i32>,
    pub bio: Option<String>,
    pub expertise: Option<Vec<String>>,
    pub meet_link: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateMentorRequest {
    pub fn to_changeset(self) -> UpdateMentorEntity {
        UpdateMentorEntity {
            name: self.name,
            email: self.email.map(|email| email.trim().to_ascii_lowercase()),
            role: self.role.map(Some),
            college: self.college,
            price: self.price,
            bio: self.bio.map(Some),
            expertise: self.expertise,
            meet_link: self.meet_link.map(Some),
            image_url: self.image_url.map(Some),
            is_active: self.is_active,
            updated_at: None,
        }
    }
}

/// What a mentor may change about themselves from the dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MentorProfileUpdateRequest {
    pub bio: Option<String>,
    pub expertise: Option<Vec<String>>,
    pub meet_link: Option<String>,
    pub price: Option<i32>,
}

impl MentorProfileUpdateRequest {
    pub fn to_changeset(self) -> UpdateMentorEntity {
        UpdateMentorEntity {
            bio: self.bio.map(Some),
            expertise: self.expertise,
            meet_link: self.meet_link.map(Some),
            price: self.price,
            ..UpdateMentorEntity::default()
        }
    }
}
