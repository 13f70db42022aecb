//! Local validation of inputs before they are handed to the service.

use crate::entities::ContactRow;
use crate::error::ValidationError;
use std::collections::HashSet;

/// The rows of a batch that can be confirmed.
///
/// Rows without an email are skipped. What remains must be non-empty and
/// unique by email (case-insensitive); row numbers in errors are 1-based.
pub fn confirmable_contacts(rows: &[ContactRow]) -> Result<Vec<ContactRow>, ValidationError> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut kept = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let email = row.email.trim();
        if email.is_empty() {
            continue;
        }
        if !seen.insert(email.to_ascii_lowercase()) {
            return Err(ValidationError::DuplicateEmail {
                email: email.to_string(),
                row: index + 1,
            });
        }
        kept.push(row.clone());
    }
    if kept.is_empty() {
        return Err(ValidationError::EmptyContacts);
    }
    Ok(kept)
}

/// Sequence steps are numbered from 1.
pub fn validate_step_number(step_number: u32) -> Result<(), ValidationError> {
    if step_number == 0 {
        return Err(ValidationError::InvalidValue {
            field: "step_number".to_string(),
            reason: "must be >= 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_batch_rejected() {
        assert_eq!(confirmable_contacts(&[]), Err(ValidationError::EmptyContacts));
    }

    #[test]
    fn blank_emails_are_skipped() {
        let rows = vec![ContactRow::new("  "), ContactRow::new("a@x.com"), ContactRow::new("")];
        assert_eq!(confirmable_contacts(&rows), Ok(vec![ContactRow::new("a@x.com")]));

        let blanks = vec![ContactRow::new(""), ContactRow::new(" ")];
        assert_eq!(confirmable_contacts(&blanks), Err(ValidationError::EmptyContacts));
    }

    #[test]
    fn duplicate_email_is_case_insensitive() {
        let rows = vec![ContactRow::new("a@x.com"), ContactRow::new("A@X.com")];
        assert!(matches!(
            confirmable_contacts(&rows),
            Err(ValidationError::DuplicateEmail { row: 2, .. })
        ));
    }

    #[test]
    fn step_zero_rejected() {
        assert!(validate_step_number(0).is_err());
        assert!(validate_step_number(1).is_ok());
    }

    proptest! {
        #[test]
        fn distinct_emails_always_validate(names in prop::collection::btree_set("[a-z]{1,12}", 1..20)) {
            let rows: Vec<ContactRow> = names
                .iter()
                .map(|n| ContactRow::new(format!("{}@example.com", n)))
                .collect();
            prop_assert_eq!(confirmable_contacts(&rows), Ok(rows.clone()));
        }
    }
}
