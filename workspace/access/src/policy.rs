//! Group authorization policy for company mutations.
//!
//! These checks are pure: they only compare group names, so handlers load
//! the current state first and call them before writing anything. A
//! superuser passes every membership check; structural rules such as the
//! minimum of one owner group apply to everyone.

use tracing::{debug, warn};

use crate::error::{AccessError, Result};
use crate::principal::Principal;

/// Field the membership errors are reported against.
pub const OWNER_GROUPS_FIELD: &str = "owner_groups";

/// Fixed message for a failed membership check.
pub const NOT_A_MEMBER_MESSAGE: &str = "You must be in at least one of the specified group.";

/// Message for an owner group list without entries.
pub const EMPTY_OWNER_GROUPS_MESSAGE: &str = "At least one group is required.";

pub const CODE_FIELD: &str = "code";

pub const GROUP_NAME_MAX_LENGTH: usize = 150;

pub const CODE_IMMUTABLE_MESSAGE: &str = "Company code cannot be changed.";

/// Trims a group name and rejects it when blank or longer than
/// [`GROUP_NAME_MAX_LENGTH`] characters.
pub fn normalize_group_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > GROUP_NAME_MAX_LENGTH {
        return Err(AccessError::validation(
            OWNER_GROUPS_FIELD,
            format!("Group names must be 1 to {} characters long.", GROUP_NAME_MAX_LENGTH),
        ));
    }
    Ok(name.to_string())
}

fn require_membership<S: AsRef<str>>(principal: &Principal, groups: &[S], which: &str) -> Result<()> {
    if principal.is_superuser || principal.is_member_of_any(groups.iter().map(AsRef::as_ref)) {
        return Ok(());
    }
    warn!(
        "{} is not a member of any {} owner group",
        principal.username, which
    );
    Err(AccessError::authorization(OWNER_GROUPS_FIELD, NOT_A_MEMBER_MESSAGE))
}

fn require_non_empty<S>(requested: &[S]) -> Result<()> {
    if requested.is_empty() {
        return Err(AccessError::validation(
            OWNER_GROUPS_FIELD,
            EMPTY_OWNER_GROUPS_MESSAGE,
        ));
    }
    Ok(())
}

/// A company may be created with `requested` owner groups when the principal
/// belongs to at least one of them.
pub fn authorize_create<S: AsRef<str>>(principal: &Principal, requested: &[S]) -> Result<()> {
    require_non_empty(requested)?;
    require_membership(principal, requested, "requested")?;
    debug!("{} may create a company with the requested groups", principal.username);
    Ok(())
}

/// Replacing the owner groups requires membership of both the current and the
/// requested set; membership of the requested set alone is not enough.
pub fn authorize_replace<S, T>(principal: &Principal, current: &[S], requested: &[T]) -> Result<()>
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    authorize_partial_update(principal, current, Some(requested))
}

/// Like [`authorize_replace`], except that an omitted group list only needs
/// the current-group check.
pub fn authorize_partial_update<S, T>(
    principal: &Principal,
    current: &[S],
    requested: Option<&[T]>,
) -> Result<()>
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    if let Some(requested) = requested {
        require_non_empty(requested)?;
    }
    require_membership(principal, current, "current")?;
    if let Some(requested) = requested {
        require_membership(principal, requested, "requested")?;
    }
    debug!("{} may update the company", principal.username);
    Ok(())
}

/// Deleting a company requires membership of its current owner groups.
pub fn authorize_delete<S: AsRef<str>>(principal: &Principal, current: &[S]) -> Result<()> {
    require_membership(principal, current, "current")
}

/// Only superusers may change a company code after creation. Resubmitting
/// the current code is not a change.
pub fn authorize_code_change(principal: &Principal, current: &str, requested: Option<&str>) -> Result<()> {
    match requested {
        Some(code) if code != current && !principal.is_superuser => {
            warn!(
                "{} attempted to change company code {} to {}",
                principal.username, current, code
            );
            Err(AccessError::validation(CODE_FIELD, CODE_IMMUTABLE_MESSAGE))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::principal;

    const NONE: Option<&[&str]> = None;

    fn assert_membership_error(result: Result<()>) {
        match result {
            Err(AccessError::Authorization { field, message }) => {
                assert_eq!(field, OWNER_GROUPS_FIELD);
                assert_eq!(message, NOT_A_MEMBER_MESSAGE);
            }
            other => panic!("expected authorization error, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_group_name() {
        assert_eq!(normalize_group_name("  shared ").unwrap(), "shared");
        assert_eq!(
            normalize_group_name(&"g".repeat(GROUP_NAME_MAX_LENGTH)).unwrap().len(),
            GROUP_NAME_MAX_LENGTH
        );
        let too_long = "g".repeat(GROUP_NAME_MAX_LENGTH + 1);
        for bad in ["", "   ", too_long.as_str()] {
            match normalize_group_name(bad) {
                Err(AccessError::Validation { field, .. }) => assert_eq!(field, OWNER_GROUPS_FIELD),
                other => panic!("expected validation error for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_create_requires_intersection() {
        let member = principal(false, &["company_ABC002"]);

        assert!(authorize_create(&member, &["company_ABC002"]).is_ok());
        assert!(authorize_create(&member, &["other", "company_ABC002"]).is_ok());
        assert_membership_error(authorize_create(&member, &["company_ABC001"]));
    }

    #[test]
    fn test_superuser_may_assign_any_group() {
        let admin = principal(true, &[]);
        assert!(authorize_create(&admin, &["never_seen_before"]).is_ok());
        assert!(authorize_replace(&admin, &["a"], &["b"]).is_ok());
        assert!(authorize_partial_update(&admin, &[] as &[&str], NONE).is_ok());
        assert!(authorize_delete(&admin, &["a"]).is_ok());
    }

    #[test]
    fn test_empty_group_list_is_a_validation_error() {
        let admin = principal(true, &[]);
        let empty: &[&str] = &[];

        for result in [
            authorize_create(&admin, empty),
            authorize_replace(&admin, &["a"], empty),
            authorize_partial_update(&admin, &["a"], Some(empty)),
        ] {
            match result {
                Err(AccessError::Validation { field, message }) => {
                    assert_eq!(field, OWNER_GROUPS_FIELD);
                    assert_eq!(message, EMPTY_OWNER_GROUPS_MESSAGE);
                }
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_replace_requires_both_current_and_requested() {
        let member = principal(false, &["company_ABC001", "shared"]);

        // Member of both sets
        assert!(authorize_replace(&member, &["company_ABC001"], &["shared"]).is_ok());
        // Member of the current set only
        assert_membership_error(authorize_replace(&member, &["company_ABC001"], &["company_FXC"]));
        // Member of the requested set only: no takeover of someone else's company
        assert_membership_error(authorize_replace(&member, &["company_FXC"], &["shared"]));
    }

    #[test]
    fn test_partial_update_without_groups_checks_current_only() {
        let member = principal(false, &["company_ABC001"]);

        assert!(authorize_partial_update(&member, &["company_ABC001"], NONE).is_ok());
        assert_membership_error(authorize_partial_update(&member, &["company_FXC"], NONE));
        assert_membership_error(authorize_partial_update(
            &member,
            &["company_ABC001"],
            Some(&["company_FXC"][..]),
        ));
    }

    #[test]
    fn test_code_is_immutable_for_regular_users() {
        let member = principal(false, &["company_ABC001"]);
        let admin = principal(true, &[]);

        assert!(authorize_code_change(&member, "ABC001", None).is_ok());
        assert!(authorize_code_change(&member, "ABC001", Some("ABC001")).is_ok());
        match authorize_code_change(&member, "ABC001", Some("XYZ999")) {
            Err(AccessError::Validation { field, message }) => {
                assert_eq!(field, CODE_FIELD);
                assert_eq!(message, CODE_IMMUTABLE_MESSAGE);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(authorize_code_change(&admin, "ABC001", Some("XYZ999")).is_ok());
    }
}
