/// Every accepted address ends with this, byte for byte.
pub const COLLEGE_EMAIL_SUFFIX: &str = "@mnnit.ac.in";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub reg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("email is not a college address of the form name.20XXXXXX@mnnit.ac.in")]
    InvalidFormat,
}

/// Split a college email of the form `firstname.20XXXXXX@mnnit.ac.in` into
/// the display name and registration id. No case folding or trimming.
pub fn parse_college_email(email: &str) -> Result<Identity, IdentityError> {
    let local = email
        .strip_suffix(COLLEGE_EMAIL_SUFFIX)
        .ok_or(IdentityError::InvalidFormat)?;
    let (name, reg) = local.split_once('.').ok_or(IdentityError::InvalidFormat)?;

    let name_ok = !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphabetic());
    let reg_ok = reg.len() == 8 && reg.starts_with("20") && reg.bytes().all(|b| b.is_ascii_digit());
    if !name_ok || !reg_ok {
        return Err(IdentityError::InvalidFormat);
    }

    Ok(Identity {
        name: name.to_string(),
        reg: reg.to_string(),
    })
}
