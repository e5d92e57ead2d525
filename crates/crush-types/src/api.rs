use serde::Deserialize;

// -- Login --

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub branch: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpForm {
    pub email: String,
    pub otp: String,
    /// Echoed back by the OTP page; the id captured at login takes precedence.
    #[serde(default)]
    pub reg: String,
}

// -- Choices --

#[derive(Debug, Deserialize)]
pub struct ChoicesQuery {
    #[serde(default)]
    pub reg: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitChoicesForm {
    pub reg: String,
    /// Comma separated registration ids.
    #[serde(default)]
    pub crushes: String,
}
