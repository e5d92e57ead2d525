use std::collections::{HashMap, HashSet};

use crush_types::models::User;

/// Students who listed `subject` and were listed by `subject`.
///
/// Output follows the subject's own crush order. Ids without a roster entry,
/// one-sided crushes, repeats and the subject's own id are skipped.
pub fn mutual_matches(users: &HashMap<String, User>, subject: &User) -> Vec<User> {
    let mut seen = HashSet::new();
    subject
        .crushes
        .iter()
        .filter(|reg| **reg != subject.reg)
        .filter(|reg| seen.insert(reg.as_str()))
        .filter_map(|reg| users.get(reg))
        .filter(|other| other.crushes.contains(&subject.reg))
        .cloned()
        .collect()
}
