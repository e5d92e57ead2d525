pub mod auth;
pub mod choices;
pub mod error;
pub mod identity;
pub mod mailer;
pub mod matching;
pub mod otp;
pub mod pages;
pub mod roster;
pub mod routes;
