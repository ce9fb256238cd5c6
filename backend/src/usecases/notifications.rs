use crates::{
    domain::{
        entities::{bookings::BookingEntity, mentors::MentorEntity},
        value_objects::enums::session_types::SessionType,
    },
    email::{
        resend_client::EmailMessage,
        templates::{RenderedEmail, SessionDetails},
    },
};
use tracing::{error, info};

use super::gateways::Mailer;

/// Sends one email and swallows the failure. Returns whether it went out.
pub async fn send_best_effort(
    mailer: &dyn Mailer,
    to: &str,
    email: RenderedEmail,
    kind: &'static str,
) -> bool {
    let message = EmailMessage {
        to: to.to_string(),
        subject: email.subject,
        html: email.html,
    };

    match mailer.send(message).await {
        Ok(()) => {
            info!(kind, to, "notifications: email sent");
            true
        }
        Err(err) => {
            error!(kind, to, error = ?err, "notifications: email failed");
            false
        }
    }
}

pub fn session_details(booking: &BookingEntity, mentor: &MentorEntity) -> SessionDetails {
    let session_type = SessionType::from_str(&booking.session_type);
    SessionDetails {
        user_name: booking.user_name.clone(),
        user_email: booking.user_email.clone(),
        user_phone: booking.user_phone.clone(),
        mentor_name: mentor.name.clone(),
        session_label: session_type
            .map(|t| t.label().to_string())
            .unwrap_or_else(|| booking.session_type.clone()),
        duration_minutes: session_type
            .map(|t| t.duration_minutes())
            .unwrap_or_else(|| minutes_between(booking)),
        date: booking.date,
        start_time: booking.start_time,
        end_time: booking.end_time,
        meet_link: booking.meet_link.clone(),
        price: booking.session_price,
    }
}

fn minutes_between(booking: &BookingEntity) -> u32 {
    let minutes = (booking.end_time - booking.start_time).num_minutes();
    u32::try_from(minutes).unwrap_or_default()
}
