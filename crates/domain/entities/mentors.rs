use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::mentors;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = mentors)]
pub struct MentorEntity {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub college: String,
    /// Whole rupees for a standard session.
    pub price: i32,
    pub bio: Option<String>,
    pub expertise: Vec<String>,
    pub meet_link: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = mentors)]
pub struct InsertMentorEntity {
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

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = mentors)]
pub struct UpdateMentorEntity {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Option<String>>,
    pub college: Option<String>,
    pub price: Option<i32>,
    pub bio: Option<Option<String>>,
    pub expertise: Option<Vec<String>>,
    pub meet_link: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}
