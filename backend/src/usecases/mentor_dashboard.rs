use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use crates::domain::{
    entities::{availability_slots::InsertAvailabilitySlotEntity, mentors::MentorEntity},
    repositories::{
        availability_slots::AvailabilitySlotRepository, bookings::BookingRepository,
        mentors::MentorRepository,
    },
    value_objects::{
        bookings::BookingDto,
        mentors::{AdminMentorDto, MentorProfileUpdateRequest},
        slots::{CreateSlotRequest, SlotDto},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::mentors::{MentorError, validate_meet_link, validate_price};
use crate::axum_http::error_responses::StatusCodeError;

#[derive(Debug, Error)]
pub enum MentorDashboardError {
    #[error("no mentor profile is linked to this account")]
    NotAMentor,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("slot not found")]
    SlotNotFound,
    #[error("slot is booked or reserved")]
    SlotInUse,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StatusCodeError for MentorDashboardError {
    fn status_code(&self) -> StatusCode {
        match self {
            MentorDashboardError::NotAMentor => StatusCode::FORBIDDEN,
            MentorDashboardError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            MentorDashboardError::SlotNotFound => StatusCode::NOT_FOUND,
            MentorDashboardError::SlotInUse => StatusCode::CONFLICT,
            MentorDashboardError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MentorError> for MentorDashboardError {
    fn from(value: MentorError) -> Self {
        match value {
            MentorError::InvalidRequest(message) => MentorDashboardError::InvalidRequest(message),
            MentorError::NotFound => MentorDashboardError::NotAMentor,
            MentorError::Internal(err) => MentorDashboardError::Internal(err),
        }
    }
}

pub struct MentorDashboardUseCase<M, S, B>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
{
    mentor_repo: Arc<M>,
    slot_repo: Arc<S>,
    booking_repo: Arc<B>,
}

impl<M, S, B> MentorDashboardUseCase<M, S, B>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
{
    pub fn new(mentor_repo: Arc<M>, slot_repo: Arc<S>, booking_repo: Arc<B>) -> Self {
        Self {
            mentor_repo,
            slot_repo,
            booking_repo,
        }
    }

    async fn mentor_for_user(&self, user_id: Uuid) -> Result<MentorEntity, MentorDashboardError> {
        self.mentor_repo
            .find_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "mentor_dashboard: mentor lookup failed");
                MentorDashboardError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, "mentor_dashboard: account has no mentor profile");
                MentorDashboardError::NotAMentor
            })
    }

    pub async fn list_slots(&self, user_id: Uuid) -> Result<Vec<SlotDto>, MentorDashboardError> {
        let mentor = self.mentor_for_user(user_id).await?;
        let slots = self
            .slot_repo
            .list_for_mentor(mentor.id, Utc::now().date_naive())
            .await
            .map_err(MentorDashboardError::Internal)?;
        Ok(slots.into_iter().map(SlotDto::from).collect())
    }

    pub async fn create_slot(
        &self,
        user_id: Uuid,
        request: CreateSlotRequest,
    ) -> Result<SlotDto, MentorDashboardError> {
        if request.end_time <= request.start_time {
            return Err(MentorDashboardError::InvalidRequest(
                "end_time must be after start_time".to_string(),
            ));
        }
        let now = Utc::now().naive_utc();
        if request.date.and_time(request.start_time) <= now {
            return Err(MentorDashboardError::InvalidRequest(
                "slot must start in the future".to_string(),
            ));
        }

        let mentor = self.mentor_for_user(user_id).await?;
        let created = self
            .slot_repo
            .create(InsertAvailabilitySlotEntity {
                mentor_id: mentor.id,
                date: request.date,
                start_time: request.start_time,
                end_time: request.end_time,
                is_booked: false,
                is_reserved: false,
            })
            .await
            .map_err(|err| {
                error!(mentor_id = %mentor.id, db_error = ?err, "mentor_dashboard: slot create failed");
                MentorDashboardError::Internal(err)
            })?;

        info!(mentor_id = %mentor.id, slot_id = %created.id, "mentor_dashboard: slot created");
        Ok(created.into())
    }

    pub async fn delete_slot(&self, user_id: Uuid, slot_id: Uuid) -> Result<(), MentorDashboardError> {
        let mentor = self.mentor_for_user(user_id).await?;

        let owned = self
            .slot_repo
            .find_by_id(slot_id)
            .await
            .map_err(MentorDashboardError::Internal)?
            .is_some_and(|slot| slot.mentor_id == mentor.id);
        if !owned {
            return Err(MentorDashboardError::SlotNotFound);
        }

        let deleted = self
            .slot_repo
            .delete_unclaimed(slot_id, mentor.id, Utc::now())
            .await
            .map_err(|err| {
                error!(%slot_id, db_error = ?err, "mentor_dashboard: slot delete failed");
                MentorDashboardError::Internal(err)
            })?;
        if !deleted {
            return Err(MentorDashboardError::SlotInUse);
        }

        info!(mentor_id = %mentor.id, %slot_id, "mentor_dashboard: slot deleted");
        Ok(())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: MentorProfileUpdateRequest,
    ) -> Result<AdminMentorDto, MentorDashboardError> {
        if let Some(price) = request.price {
            validate_price(price)?;
        }
        validate_meet_link(request.meet_link.as_deref())?;

        let mentor = self.mentor_for_user(user_id).await?;
        let mut changeset = request.to_changeset();
        changeset.updated_at = Some(Utc::now());

        let updated = self
            .mentor_repo
            .update(mentor.id, changeset)
            .await
            .map_err(MentorDashboardError::Internal)?
            .ok_or(MentorDashboardError::NotAMentor)?;

        info!(mentor_id = %mentor.id, "mentor_dashboard: profile updated");
        Ok(updated.into())
    }

    pub async fn upcoming_bookings(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<BookingDto>, MentorDashboardError> {
        let mentor = self.mentor_for_user(user_id).await?;
        let bookings = self
            .booking_repo
            .list_for_mentor(mentor.id, Utc::now().date_naive())
            .await
            .map_err(MentorDashboardError::Internal)?;
        Ok(bookings.into_iter().map(BookingDto::from).collect())
    }
}
