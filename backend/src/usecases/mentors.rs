use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use crates::domain::{
    entities::mentors::MentorEntity,
    repositories::{availability_slots::AvailabilitySlotRepository, mentors::MentorRepository},
    value_objects::{
        mentors::{AdminMentorDto, CreateMentorRequest, MentorDto, UpdateMentorRequest},
        slots::SlotDto,
    },
};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::axum_http::error_responses::StatusCodeError;

#[derive(Debug, Error)]
pub enum MentorError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("mentor not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StatusCodeError for MentorError {
    fn status_code(&self) -> StatusCode {
        match self {
            MentorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            MentorError::NotFound => StatusCode::NOT_FOUND,
            MentorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub(crate) fn validate_price(price: i32) -> Result<(), MentorError> {
    if price < 1 {
        return Err(MentorError::InvalidRequest(
            "price must be at least 1 rupee".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_meet_link(meet_link: Option<&str>) -> Result<(), MentorError> {
    match meet_link.map(str::trim).filter(|link| !link.is_empty()) {
        Some(link) if url::Url::parse(link).is_err() => Err(MentorError::InvalidRequest(
            "meet_link must be an absolute URL".to_string(),
        )),
        _ => Ok(()),
    }
}

pub struct MentorUseCase<M, S>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
{
    mentor_repo: Arc<M>,
    slot_repo: Arc<S>,
}

impl<M, S> MentorUseCase<M, S>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
{
    pub fn new(mentor_repo: Arc<M>, slot_repo: Arc<S>) -> Self {
        Self {
            mentor_repo,
            slot_repo,
        }
    }

    pub async fn list_active(&self) -> Result<Vec<MentorDto>, MentorError> {
        let mentors = self.mentor_repo.list_active().await.map_err(|err| {
            error!(db_error = ?err, "mentors: list failed");
            MentorError::Internal(err)
        })?;
        Ok(mentors.into_iter().map(MentorDto::from).collect())
    }

    async fn find_active(&self, mentor_id: Uuid) -> Result<MentorEntity, MentorError> {
        self.mentor_repo
            .find_by_id(mentor_id)
            .await
            .map_err(|err| {
                error!(%mentor_id, db_error = ?err, "mentors: lookup failed");
                MentorError::Internal(err)
            })?
            .filter(|mentor| mentor.is_active)
            .ok_or(MentorError::NotFound)
    }

    pub async fn get_active(&self, mentor_id: Uuid) -> Result<MentorDto, MentorError> {
        Ok(self.find_active(mentor_id).await?.into())
    }

    /// Upcoming slots a student can still pick.
    pub async fn list_bookable_slots(&self, mentor_id: Uuid) -> Result<Vec<SlotDto>, MentorError> {
        let mentor = self.find_active(mentor_id).await?;
        let now = Utc::now();

        let mut slots = self
            .slot_repo
            .list_bookable(mentor.id, now.date_naive(), now)
            .await
            .map_err(|err| {
                error!(%mentor_id, db_error = ?err, "mentors: slot listing failed");
                MentorError::Internal(err)
            })?;
        slots.sort_by_key(|slot| (slot.date, slot.start_time));

        Ok(slots.into_iter().map(SlotDto::from).collect())
    }

    pub async fn list_all_for_admin(&self) -> Result<Vec<AdminMentorDto>, MentorError> {
        let mentors = self.mentor_repo.list_all().await.map_err(MentorError::Internal)?;
        Ok(mentors.into_iter().map(AdminMentorDto::from).collect())
    }

    pub async fn create(&self, request: CreateMentorRequest) -> Result<AdminMentorDto, MentorError> {
        if request.name.trim().is_empty() || request.college.trim().is_empty() {
            return Err(MentorError::InvalidRequest(
                "name and college are required".to_string(),
            ));
        }
        if !request.email.contains('@') {
            return Err(MentorError::InvalidRequest(
                "a valid email is required".to_string(),
            ));
        }
        validate_price(request.price)?;
        validate_meet_link(request.meet_link.as_deref())?;

        let created = self
            .mentor_repo
            .create(request.to_entity())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "mentors: create failed");
                MentorError::Internal(err)
            })?;

        info!(mentor_id = %created.id, "mentors: mentor created");
        Ok(created.into())
    }

    pub async fn update(
        &self,
        mentor_id: Uuid,
        request: UpdateMentorRequest,
    ) -> Result<AdminMentorDto, MentorError> {
        if let Some(price) = request.price {
            validate_price(price)?;
        }
        validate_meet_link(request.meet_link.as_deref())?;

        let mut changeset = request.to_changeset();
        changeset.updated_at = Some(Utc::now());

        let updated = self
            .mentor_repo
            .update(mentor_id, changeset)
            .await
            .map_err(|err| {
                error!(%mentor_id, db_error = ?err, "mentors: update failed");
                MentorError::Internal(err)
            })?
            .ok_or(MentorError::NotFound)?;

        info!(%mentor_id, "mentors: mentor updated");
        Ok(updated.into())
    }
}
