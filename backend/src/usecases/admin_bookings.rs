use std::sync::Arc;

use axum::http::StatusCode;
use crates::domain::{
    repositories::bookings::BookingRepository,
    value_objects::{bookings::BookingDto, enums::booking_statuses::BookingStatus},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::axum_http::error_responses::StatusCodeError;

#[derive(Debug, Error)]
pub enum AdminBookingError {
    #[error("unknown booking status: {0}")]
    InvalidStatus(String),
    #[error("booking not found")]
    NotFound,
    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition { from: String, to: BookingStatus },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StatusCodeError for AdminBookingError {
    fn status_code(&self) -> StatusCode {
        match self {
            AdminBookingError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            AdminBookingError::NotFound => StatusCode::NOT_FOUND,
            AdminBookingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AdminBookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn parse_status(raw: &str) -> Result<BookingStatus, AdminBookingError> {
    BookingStatus::from_str(raw.trim()).ok_or_else(|| AdminBookingError::InvalidStatus(raw.to_string()))
}

pub struct AdminBookingUseCase<B>
where
    B: BookingRepository + Send + Sync + 'static,
{
    booking_repo: Arc<B>,
}

impl<B> AdminBookingUseCase<B>
where
    B: BookingRepository + Send + Sync + 'static,
{
    pub fn new(booking_repo: Arc<B>) -> Self {
        Self { booking_repo }
    }

    pub async fn list(&self, status: Option<&str>) -> Result<Vec<BookingDto>, AdminBookingError> {
        let status = status
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_status)
            .transpose()?;

        let bookings = self.booking_repo.list(status).await.map_err(|err| {
            error!(db_error = ?err, "admin_bookings: list failed");
            AdminBookingError::Internal(err)
        })?;
        Ok(bookings.into_iter().map(BookingDto::from).collect())
    }

    pub async fn update_status(
        &self,
        booking_id: Uuid,
        raw_status: &str,
    ) -> Result<BookingDto, AdminBookingError> {
        let next = parse_status(raw_status)?;

        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await
            .map_err(AdminBookingError::Internal)?
            .ok_or(AdminBookingError::NotFound)?;

        let current = BookingStatus::from_str(&booking.status);
        let Some(current) = current.filter(|current| current.can_transition_to(next)) else {
            warn!(
                %booking_id,
                from = %booking.status,
                to = %next,
                "admin_bookings: transition rejected"
            );
            return Err(AdminBookingError::InvalidTransition {
                from: booking.status,
                to: next,
            });
        };

        let updated = self
            .booking_repo
            .transition_status(booking_id, current, next)
            .await
            .map_err(|err| {
                error!(%booking_id, db_error = ?err, "admin_bookings: transition failed");
                AdminBookingError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%booking_id, "admin_bookings: booking changed concurrently");
                AdminBookingError::InvalidTransition {
                    from: current.to_string(),
                    to: next,
                }
            })?;

        info!(%booking_id, from = %current, to = %next, "admin_bookings: status updated");
        Ok(updated.into())
    }
}
