use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{error, warn};

use crate::identity::IdentityError;
use crate::otp::OtpError;
use crate::roster::RosterError;

/// Failures of the login and choice pages. Every variant renders as a
/// user-facing page; none of them take the server down.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Otp(#[from] OtpError),
    #[error(transparent)]
    Roster(#[from] RosterError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Identity(e) => {
                warn!("Rejected login: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    "Invalid email format. Please use your college email (e.g., john.20123456@mnnit.ac.in).",
                )
                    .into_response()
            }
            Self::Otp(OtpError::DeliveryFailed(e)) => {
                error!("OTP delivery failed: {}", e);
                (StatusCode::BAD_GATEWAY, "Error sending OTP. Please try again.").into_response()
            }
            Self::Otp(e) => {
                warn!("OTP verification failed: {}", e);
                (StatusCode::UNAUTHORIZED, "Invalid OTP. Please try again.").into_response()
            }
            Self::Roster(e @ RosterError::TooManyCandidates(_)) => {
                warn!("Rejected choices: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    "You can list at most 5 registration numbers. Please go back and try again.",
                )
                    .into_response()
            }
            Self::Roster(e) => {
                warn!("{}; sending back to login", e);
                Redirect::to("/").into_response()
            }
        }
    }
}
