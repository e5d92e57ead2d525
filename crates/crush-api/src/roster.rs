use std::collections::HashMap;
use std::collections::hash_map::Entry;

use parking_lot::RwLock;

use crush_types::models::{Attributes, User};

use crate::identity::Identity;
use crate::matching;

/// Most crushes a student may list at once.
pub const MAX_CANDIDATES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("unknown registration id {0}")]
    UnknownUser(String),
    #[error("no student with registration id {0}")]
    NotFound(String),
    #[error("at most {MAX_CANDIDATES} registration ids may be listed, got {0}")]
    TooManyCandidates(usize),
}

/// In-memory registry of students who have verified their email.
#[derive(Default)]
pub struct Roster {
    users: RwLock<HashMap<String, User>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a student, or refresh the email and attributes of a known one.
    /// The first-seen name and the crush list survive later logins.
    pub fn upsert(&self, identity: &Identity, attributes: Attributes, email: &str) -> User {
        let mut users = self.users.write();
        match users.entry(identity.reg.clone()) {
            Entry::Occupied(mut entry) => {
                let user = entry.get_mut();
                user.attributes = attributes;
                user.email = email.to_string();
                user.clone()
            }
            Entry::Vacant(entry) => entry
                .insert(User {
                    reg: identity.reg.clone(),
                    name: identity.name.clone(),
                    attributes,
                    email: email.to_string(),
                    crushes: Vec::new(),
                })
                .clone(),
        }
    }

    /// Replace the crush list of `reg` wholesale.
    pub fn set_candidates(&self, reg: &str, crushes: Vec<String>) -> Result<User, RosterError> {
        let mut users = self.users.write();
        let user = users
            .get_mut(reg)
            .ok_or_else(|| RosterError::UnknownUser(reg.to_string()))?;
        if crushes.len() > MAX_CANDIDATES {
            return Err(RosterError::TooManyCandidates(crushes.len()));
        }
        user.crushes = crushes;
        Ok(user.clone())
    }

    pub fn get(&self, reg: &str) -> Result<User, RosterError> {
        self.users
            .read()
            .get(reg)
            .cloned()
            .ok_or_else(|| RosterError::NotFound(reg.to_string()))
    }

    /// Mutual matches of `reg`, evaluated against one consistent snapshot.
    pub fn mutual_matches(&self, reg: &str) -> Result<Vec<User>, RosterError> {
        let users = self.users.read();
        let subject = users
            .get(reg)
            .ok_or_else(|| RosterError::UnknownUser(reg.to_string()))?;
        Ok(matching::mutual_matches(&users, subject))
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

/// Split the comma separated crush field, trimming blanks and dropping
/// empty entries. Duplicates are kept.
pub fn parse_candidates(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str, reg: &str) -> Identity {
        Identity {
            name: name.into(),
            reg: reg.into(),
        }
    }

    fn attrs(branch: &str, gender: &str) -> Attributes {
        Attributes {
            branch: branch.into(),
            gender: gender.into(),
        }
    }

    #[test]
    fn upsert_keeps_name_and_crushes() {
        let roster = Roster::new();
        roster.upsert(&identity("rahul", "20123456"), attrs("CSE", "M"), "rahul.20123456@mnnit.ac.in");
        roster.set_candidates("20123456", vec!["20123457".into()]).unwrap();

        let user = roster.upsert(&identity("rahulk", "20123456"), attrs("ECE", "M"), "rahulk.20123456@mnnit.ac.in");
        assert_eq!(user.name, "rahul");
        assert_eq!(user.attributes, attrs("ECE", "M"));
        assert_eq!(user.email, "rahulk.20123456@mnnit.ac.in");
        assert_eq!(user.crushes, ["20123457"]);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn set_candidates_replaces_list() {
        let roster = Roster::new();
        roster.upsert(&identity("rahul", "20123456"), attrs("CSE", "M"), "rahul.20123456@mnnit.ac.in");

        roster
            .set_candidates("20123456", vec!["20000001".into(), "20000002".into()])
            .unwrap();
        let user = roster.set_candidates("20123456", vec!["20000003".into()]).unwrap();
        assert_eq!(user.crushes, ["20000003"]);
        assert_eq!(roster.get("20123456").unwrap().crushes, ["20000003"]);
    }

    #[test]
    fn unknown_students() {
        let roster = Roster::new();
        assert!(roster.is_empty());
        assert_eq!(
            roster.set_candidates("20999999", vec![]),
            Err(RosterError::UnknownUser("20999999".into()))
        );
        assert_eq!(roster.get("20999999"), Err(RosterError::NotFound("20999999".into())));
        assert_eq!(
            roster.mutual_matches("20999999"),
            Err(RosterError::UnknownUser("20999999".into()))
        );
    }

    #[test]
    fn candidate_limit() {
        let roster = Roster::new();
        roster.upsert(&identity("rahul", "20123456"), attrs("CSE", "M"), "rahul.20123456@mnnit.ac.in");

        let five = parse_candidates("20000001,20000002,20000003,20000004,20000001");
        assert!(roster.set_candidates("20123456", five).is_ok());

        let six = parse_candidates("20000001,20000002,20000003,20000004,20000005,20000006");
        assert_eq!(
            roster.set_candidates("20123456", six),
            Err(RosterError::TooManyCandidates(6))
        );

        // Unknown students are reported as such whatever they submit.
        let six = parse_candidates("20000001,20000002,20000003,20000004,20000005,20000006");
        assert_eq!(
            roster.set_candidates("20999999", six),
            Err(RosterError::UnknownUser("20999999".into()))
        );
    }

    #[test]
    fn parses_crush_field() {
        assert_eq!(
            parse_candidates(" 20123457 ,20123458,,20123457, "),
            ["20123457", "20123458", "20123457"]
        );
        assert!(parse_candidates("").is_empty());
        assert!(parse_candidates(" , ").is_empty());
    }
}
