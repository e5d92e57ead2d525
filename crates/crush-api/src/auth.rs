use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    response::{Html, Redirect},
};
use tracing::{info, warn};

use crush_types::api::{LoginForm, VerifyOtpForm};
use crush_types::models::Attributes;

use crate::error::ApiError;
use crate::identity::{Identity, parse_college_email};
use crate::mailer::Mailer;
use crate::otp::CodeVerifier;
use crate::pages;
use crate::roster::Roster;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub roster: Roster,
    pub codes: CodeVerifier<Registration>,
}

impl AppStateInner {
    pub fn new(mailer: Arc<dyn Mailer>) -> AppState {
        Self::with_codes(CodeVerifier::new(mailer))
    }

    pub fn with_codes(codes: CodeVerifier<Registration>) -> AppState {
        Arc::new(Self {
            roster: Roster::new(),
            codes,
        })
    }
}

/// What the login form told us, held until the emailed code comes back.
#[derive(Debug, Clone)]
pub struct Registration {
    pub identity: Identity,
    pub attributes: Attributes,
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Html<String>, ApiError> {
    let identity = parse_college_email(&form.email)?;
    let reg = identity.reg.clone();
    let name = identity.name.clone();

    let registration = Registration {
        identity,
        attributes: Attributes {
            branch: form.branch,
            gender: form.gender,
        },
    };
    state.codes.issue(&form.email, &name, registration).await?;

    info!("{} ({}) requested a login code", name, reg);
    Ok(Html(pages::otp_page(&form.email, &reg)))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Form(form): Form<VerifyOtpForm>,
) -> Result<Redirect, ApiError> {
    let Registration {
        identity,
        attributes,
    } = state.codes.verify(&form.email, &form.otp)?;

    if !form.reg.is_empty() && form.reg != identity.reg {
        warn!(
            "verify-otp for {} carried reg {} but the address belongs to {}",
            form.email, form.reg, identity.reg
        );
    }

    let user = state.roster.upsert(&identity, attributes, &form.email);
    info!("{} ({}) verified their email", user.name, user.reg);
    Ok(Redirect::to(&format!("/choices?reg={}", user.reg)))
}
