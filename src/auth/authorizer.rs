//! Authorization
//!
//! Decides which actions an authenticated actor may perform.

use std::fmt;

use super::credentials::Actor;
use crate::error::AuthError;

/// Capability granting every action
pub const CAP_MANAGE_OPTIONS: &str = "manage_options";
pub const CAP_EDIT_THEMES: &str = "edit_themes";
pub const CAP_MANAGE_CATALOG: &str = "manage_catalog";

/// Protected operations, one per route group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    EditTemplates,
    ManageCatalog,
    Administer,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::EditTemplates => "edit-templates",
            Action::ManageCatalog => "manage-catalog",
            Action::Administer => "administer",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Authorizer: Send + Sync {
    fn can(&self, actor: &Actor, action: Action) -> bool;
}

/// Grants actions from the capabilities attached to each API key
#[derive(Debug, Default, Clone, Copy)]
pub struct CapabilityAuthorizer;

impl Authorizer for CapabilityAuthorizer {
    fn can(&self, actor: &Actor, action: Action) -> bool {
        if actor.has_capability(CAP_MANAGE_OPTIONS) {
            return true;
        }
        match action {
            Action::EditTemplates => actor.has_capability(CAP_EDIT_THEMES),
            Action::ManageCatalog => actor.has_capability(CAP_MANAGE_CATALOG),
            Action::Administer => false,
        }
    }
}

/// `Forbidden` unless `authorizer` allows `action`
pub fn authorize(
    authorizer: &dyn Authorizer,
    actor: &Actor,
    action: Action,
) -> Result<(), AuthError> {
    if authorizer.can(actor, action) {
        Ok(())
    } else {
        Err(AuthError::Forbidden {
            actor: actor.id.clone(),
            action: action.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manage_options_grants_everything() {
        let admin = Actor::new("admin", [CAP_MANAGE_OPTIONS]);
        for action in [Action::EditTemplates, Action::ManageCatalog, Action::Administer] {
            assert!(CapabilityAuthorizer.can(&admin, action));
        }
    }

    #[test]
    fn narrow_capabilities_grant_one_action() {
        let designer = Actor::new("designer", [CAP_EDIT_THEMES]);
        assert!(CapabilityAuthorizer.can(&designer, Action::EditTemplates));
        assert!(!CapabilityAuthorizer.can(&designer, Action::ManageCatalog));
        assert!(!CapabilityAuthorizer.can(&designer, Action::Administer));

        let shop = Actor::new("shop", [CAP_MANAGE_CATALOG]);
        assert!(CapabilityAuthorizer.can(&shop, Action::ManageCatalog));
        assert!(!CapabilityAuthorizer.can(&shop, Action::EditTemplates));
    }

    #[test]
    fn authorize_reports_actor_and_action() {
        let nobody = Actor::new("viewer", Vec::<String>::new());
        assert_eq!(
            authorize(&CapabilityAuthorizer, &nobody, Action::Administer),
            Err(AuthError::Forbidden {
                actor: "viewer".into(),
                action: "administer".into()
            })
        );
    }
}
