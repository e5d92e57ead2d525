use axum::{
    Form,
    extract::{Query, State},
    response::Html,
};
use tracing::info;

use crush_types::api::{ChoicesQuery, SubmitChoicesForm};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::pages;
use crate::roster::parse_candidates;

pub async fn choices(
    State(state): State<AppState>,
    Query(query): Query<ChoicesQuery>,
) -> Result<Html<String>, ApiError> {
    let user = state.roster.get(&query.reg)?;
    Ok(Html(pages::choices_page(&user)))
}

pub async fn submit_choices(
    State(state): State<AppState>,
    Form(form): Form<SubmitChoicesForm>,
) -> Result<Html<String>, ApiError> {
    let user = state
        .roster
        .set_candidates(&form.reg, parse_candidates(&form.crushes))?;
    let matches = state.roster.mutual_matches(&user.reg)?;

    info!(
        "{} ({}) listed {} crushes, {} mutual",
        user.name,
        user.reg,
        user.crushes.len(),
        matches.len()
    );
    Ok(Html(pages::results_page(&user, &matches)))
}
