use crate::error::MetaError;
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PermissionBits: u32 {
        const READ = 1;
        const WRITE = 2;
    }
}

/// Identity every request carries.
///
/// `partition` may name a partition by uuid or by name on the way in; the
/// service layer rewrites it to the resolved uuid before anything below it
/// sees the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user: String,
    pub project: String,
    pub partition: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Session {
    pub fn new(
        user: impl Into<String>,
        project: impl Into<String>,
        partition: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            project: project.into(),
            partition: partition.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn validate(&self) -> Result<(), MetaError> {
        if self.partition.trim().is_empty() {
            return Err(MetaError::InvalidInput("session partition is required".into()));
        }
        if self.project.trim().is_empty() {
            return Err(MetaError::InvalidInput("session project is required".into()));
        }
        Ok(())
    }
}

/// One access-control entry. With neither `project` nor `role` set the
/// entry is a global grant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyPermission {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub permission: PermissionBits,
}

impl PropertyPermission {
    pub fn global(permission: PermissionBits) -> Self {
        Self {
            project: None,
            role: None,
            permission,
        }
    }

    pub fn for_project(project: impl Into<String>, permission: PermissionBits) -> Self {
        Self {
            project: Some(project.into()),
            role: None,
            permission,
        }
    }

    pub fn for_role(role: impl Into<String>, permission: PermissionBits) -> Self {
        Self {
            project: None,
            role: Some(role.into()),
            permission,
        }
    }

    pub fn is_global(&self) -> bool {
        is_blank(&self.project) && is_blank(&self.role)
    }

    pub fn applies_to(&self, session: &Session) -> bool {
        let project_ok = match &self.project {
            Some(p) if !p.is_empty() => *p == session.project,
            _ => true,
        };
        let role_ok = match &self.role {
            Some(r) if !r.is_empty() => session.has_role(r),
            _ => true,
        };
        project_ok && role_ok
    }
}

/// An empty entry list places no restriction.
pub fn permits(entries: &[PropertyPermission], session: &Session, wanted: PermissionBits) -> bool {
    entries.is_empty()
        || entries
            .iter()
            .any(|e| e.applies_to(session) && e.permission.contains(wanted))
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::is_empty).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::{PermissionBits, PropertyPermission, Session, permits};
    use crate::error::MetaError;

    #[test]
    fn bits_match_wire_values() {
        assert_eq!(PermissionBits::READ.bits(), 1);
        assert_eq!(PermissionBits::WRITE.bits(), 2);
        assert!((PermissionBits::READ | PermissionBits::WRITE).contains(PermissionBits::WRITE));
    }

    #[test]
    fn blank_entry_is_global() {
        let entry = PropertyPermission {
            project: Some(String::new()),
            role: None,
            permission: PermissionBits::READ,
        };
        assert!(entry.is_global());
        assert!(!PropertyPermission::for_role("admin", PermissionBits::READ).is_global());
    }

    #[test]
    fn project_and_role_entries_apply_selectively() {
        let session = Session::new("alice", "proj-a", "p1").with_role("operator");
        let entries = vec![
            PropertyPermission::global(PermissionBits::READ),
            PropertyPermission::for_project("proj-b", PermissionBits::WRITE),
        ];
        assert!(permits(&entries, &session, PermissionBits::READ));
        assert!(!permits(&entries, &session, PermissionBits::WRITE));

        let by_role = vec![PropertyPermission::for_role(
            "operator",
            PermissionBits::READ | PermissionBits::WRITE,
        )];
        assert!(permits(&by_role, &session, PermissionBits::WRITE));
        assert!(permits(&[], &session, PermissionBits::WRITE));
    }

    #[test]
    fn session_requires_partition_and_project() {
        let err = Session::new("alice", "", "p1")
            .validate()
            .expect_err("missing project");
        assert!(matches!(err, MetaError::InvalidInput(_)));
        Session::new("alice", "proj", "p1")
            .validate()
            .expect("valid");
    }
}
