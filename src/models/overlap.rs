// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Overlap checks between product and survey windows.
//!
//! A product window may never share time with a survey window. Two products
//! or two surveys may overlap freely.

use super::annotation::Annotation;
use crate::error::ValidationError;

/// First record of the other type whose window intersects `candidate`.
///
/// Records with the candidate's own id are skipped, so editing a record
/// never conflicts with its stored copy.
pub fn find_conflict<'a, I>(candidate: &Annotation, existing: I) -> Option<&'a Annotation>
where
    I: IntoIterator<Item = &'a Annotation>,
{
    existing.into_iter().find(|other| {
        other.id() != candidate.id()
            && other.kind() != candidate.kind()
            && candidate.overlaps(other)
    })
}

pub fn has_overlap_with_other_type<'a, I>(candidate: &Annotation, existing: I) -> bool
where
    I: IntoIterator<Item = &'a Annotation>,
{
    find_conflict(candidate, existing).is_some()
}

/// Check the time range and overlap rules for a record about to be stored.
pub fn validate_candidate<'a, I>(candidate: &Annotation, existing: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a Annotation>,
{
    let (start, end) = (candidate.start_time(), candidate.end_time());
    if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
        return Err(ValidationError::InvalidTimeRange { start, end });
    }
    if let Some(conflict) = find_conflict(candidate, existing) {
        log::warn!(
            "Rejected {} at {:.1}s, overlaps {} {}",
            candidate.kind(),
            start,
            conflict.kind(),
            conflict.id()
        );
        return Err(ValidationError::Overlap {
            conflicting: conflict.id().clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::fixtures::{product, survey};
    use crate::models::annotation::AnnotationId;
    use crate::models::store::AnnotationStore;

    #[test]
    fn test_same_id_is_ignored() {
        let p = product("1", 30.0, 45.0);
        let mut edited = survey("1", 40.0);
        edited.set_id(p.id().clone());
        // Same id never conflicts, even across variants
        assert!(!has_overlap_with_other_type(&edited, [&p]));
    }

    #[test]
    fn test_same_type_overlap_is_allowed() {
        let existing = [product("1", 30.0, 45.0), survey("2", 60.0)];
        assert!(!has_overlap_with_other_type(&product("3", 35.0, 70.0), &existing[..1]));
        assert!(!has_overlap_with_other_type(&survey("4", 60.5), &existing[1..]));
    }

    #[test]
    fn test_other_type_intersection_is_flagged() {
        let existing = [product("1", 30.0, 45.0)];
        assert!(has_overlap_with_other_type(&survey("2", 44.5), &existing));
        assert!(!has_overlap_with_other_type(&survey("2", 45.0), &existing));
        assert!(!has_overlap_with_other_type(&survey("2", 29.0), &existing));
    }

    #[test]
    fn test_scenario_reject_then_accept() {
        let mut store = AnnotationStore::from_records(vec![
            product("1", 30.0, 45.0),
            survey("2", 60.0),
        ]);

        let rejected = survey("new-a", 40.0);
        assert_eq!(
            validate_candidate(&rejected, store.iter()),
            Err(ValidationError::Overlap {
                conflicting: AnnotationId::Server("1".into())
            })
        );
        assert_eq!(store.len(), 2);

        let accepted = survey("new-b", 50.0);
        assert!(validate_candidate(&accepted, store.iter()).is_ok());
        store.add(accepted);

        let starts: Vec<f64> = store.iter().map(|a| a.start_time()).collect();
        assert_eq!(starts, vec![30.0, 50.0, 60.0]);
    }

    #[test]
    fn test_invalid_range_is_rejected() {
        let none: [Annotation; 0] = [];
        let result = validate_candidate(&product("1", 20.0, 20.0), &none);
        assert!(matches!(result, Err(ValidationError::InvalidTimeRange { .. })));
        let result = validate_candidate(&product("1", -1.0, 5.0), &none);
        assert!(matches!(result, Err(ValidationError::InvalidTimeRange { .. })));
    }
}
