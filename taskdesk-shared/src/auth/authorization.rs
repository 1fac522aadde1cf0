//! Authorization evaluator
//!
//! Every access decision in TaskDesk is made here. The functions are pure:
//! they look only at the actor and the resource handed to them, never at the
//! database or any request-global state. Loading the resource (and reporting
//! "not found") is the caller's job.
//!
//! # Permission Model
//!
//! | Action | Admin | Assignee | Other user |
//! |---|---|---|---|
//! | list tasks | all | own | own |
//! | create task | yes | - | - |
//! | read task | yes | yes | no |
//! | update task | any field | `status` only | no |
//! | delete task | yes | no | no |
//! | list comments | all | all | empty list |
//! | create comment | yes | yes | no |
//! | list users | yes | no | no |
//! | soft-delete user | yes, except self | no | no |
//!
//! An inactive actor is denied everything.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use taskdesk_shared::auth::authorization::{can_update_task, Actor};
//! use taskdesk_shared::models::user::Role;
//! # use taskdesk_shared::models::task::{Task, TaskStatus};
//! # use uuid::Uuid;
//!
//! let assignee = Actor::new(Uuid::new_v4(), Role::User);
//! # let task = Task {
//! #     id: Uuid::new_v4(),
//! #     title: "Write report".to_string(),
//! #     description: None,
//! #     status: TaskStatus::ToDo,
//! #     assigned_to: assignee.id,
//! #     created_at: chrono::Utc::now(),
//! #     updated_at: chrono::Utc::now(),
//! # };
//! let status_only: BTreeSet<String> = ["status".to_string()].into();
//! assert!(can_update_task(&assignee, &task, &status_only));
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    task::Task,
    user::{Role, User},
};

/// Task fields an assignee may change
pub const ASSIGNEE_WRITABLE_FIELDS: &[&str] = &["status"];

/// The user a decision is being made for
///
/// Built from the freshly loaded user row on every request, never from token
/// claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub is_active: bool,
}

impl Actor {
    /// An active actor
    pub fn new(id: Uuid, role: Role) -> Self {
        Self {
            id,
            role,
            is_active: true,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn is_active_admin(&self) -> bool {
        self.is_active && self.is_admin()
    }

    fn is_assignee_of(&self, task: &Task) -> bool {
        self.is_active && task.assigned_to == self.id
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            is_active: user.is_active,
        }
    }
}

/// Which tasks an actor may list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    /// Every task
    All,

    /// Only tasks assigned to this user
    AssignedTo(Uuid),
}

/// Which comments on a task an actor may list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentScope {
    /// Every comment on the task
    All,

    /// Nothing; the caller answers with an empty list rather than an error
    Hidden,
}

/// What an actor may change on a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAccess {
    /// Any writable field
    FullAccess,

    /// Only the listed fields
    FieldRestricted(&'static [&'static str]),

    /// Nothing
    Denied,
}

impl TaskAccess {
    /// Whether every field in `changed_fields` is allowed
    ///
    /// An empty change set is allowed for anything but `Denied`.
    pub fn permits<S: AsRef<str>>(&self, changed_fields: &BTreeSet<S>) -> bool
    where
        S: Ord,
    {
        match self {
            TaskAccess::FullAccess => true,
            TaskAccess::FieldRestricted(allowed) => changed_fields
                .iter()
                .all(|field| is_allowed(allowed, field.as_ref())),
            TaskAccess::Denied => false,
        }
    }

    /// Fields in `changed_fields` that this access level rejects
    pub fn rejected_fields<'a, S: AsRef<str> + Ord>(
        &self,
        changed_fields: &'a BTreeSet<S>,
    ) -> Vec<&'a str> {
        changed_fields
            .iter()
            .map(|field| field.as_ref())
            .filter(|field| match self {
                TaskAccess::FullAccess => false,
                TaskAccess::FieldRestricted(allowed) => !is_allowed(allowed, field),
                TaskAccess::Denied => true,
            })
            .collect()
    }
}

fn is_allowed(allowed: &[&str], field: &str) -> bool {
    allowed.iter().any(|name| *name == field)
}

/// Why a soft delete was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SoftDeleteDenial {
    /// The target account is already inactive
    #[error("User is already inactive")]
    AlreadyInactive,

    /// Actors may not retire their own account
    #[error("You cannot soft-delete your own account")]
    SelfTarget,

    /// Only admins may retire accounts
    #[error("Only admins can soft-delete users")]
    NotAdmin,
}

/// Error type for authorization checks at the handler boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Action requires the Admin role
    #[error("{0}")]
    AdminRequired(&'static str),

    /// Actor is neither admin nor the task's assignee
    #[error("{0}")]
    NotAssignee(&'static str),

    /// Assignee tried to change fields other than status
    #[error("Assignees may only update {allowed}; rejected fields: {}", .rejected.join(", "))]
    RestrictedFields {
        allowed: String,
        rejected: Vec<String>,
    },

    /// Actor account is inactive
    #[error("User account is inactive")]
    Inactive,
}

/// Scope of `GET /tasks/`, or `None` if the actor may not list at all
pub fn can_list_tasks(actor: &Actor) -> Option<TaskScope> {
    if !actor.is_active {
        return None;
    }

    match actor.role {
        Role::Admin => Some(TaskScope::All),
        Role::User => Some(TaskScope::AssignedTo(actor.id)),
    }
}

pub fn can_create_task(actor: &Actor) -> bool {
    actor.is_active_admin()
}

pub fn can_read_task(actor: &Actor, task: &Task) -> bool {
    actor.is_active_admin() || actor.is_assignee_of(task)
}

/// Field-level update capability of `actor` on `task`
pub fn task_update_access(actor: &Actor, task: &Task) -> TaskAccess {
    if actor.is_active_admin() {
        TaskAccess::FullAccess
    } else if actor.is_assignee_of(task) {
        TaskAccess::FieldRestricted(ASSIGNEE_WRITABLE_FIELDS)
    } else {
        TaskAccess::Denied
    }
}

/// Whether `actor` may change exactly `changed_fields` on `task`
///
/// `changed_fields` are the top-level keys of the update request, unfiltered;
/// a key the task does not have still counts against an assignee.
pub fn can_update_task(actor: &Actor, task: &Task, changed_fields: &BTreeSet<String>) -> bool {
    task_update_access(actor, task).permits(changed_fields)
}

pub fn can_delete_task(actor: &Actor, _task: &Task) -> bool {
    actor.is_active_admin()
}

pub fn can_list_comments(actor: &Actor, task: &Task) -> CommentScope {
    if actor.is_active_admin() || actor.is_assignee_of(task) {
        CommentScope::All
    } else {
        CommentScope::Hidden
    }
}

pub fn can_create_comment(actor: &Actor, task: &Task) -> bool {
    actor.is_active_admin() || actor.is_assignee_of(task)
}

pub fn can_list_users(actor: &Actor) -> bool {
    actor.is_active_admin()
}

/// Decides whether `actor` may deactivate `target`
///
/// Checks run in a fixed order: already inactive, self-target, then role.
pub fn can_soft_delete_user(actor: &Actor, target: &Actor) -> Result<(), SoftDeleteDenial> {
    if !target.is_active {
        return Err(SoftDeleteDenial::AlreadyInactive);
    }

    if target.id == actor.id {
        return Err(SoftDeleteDenial::SelfTarget);
    }

    if !actor.is_active_admin() {
        return Err(SoftDeleteDenial::NotAdmin);
    }

    Ok(())
}

/// Rejects inactive actors
pub fn require_active(actor: &Actor) -> Result<(), AuthzError> {
    if !actor.is_active {
        return Err(AuthzError::Inactive);
    }

    Ok(())
}

/// Rejects anyone but an active admin, with `message` as the reason
pub fn require_admin(actor: &Actor, message: &'static str) -> Result<(), AuthzError> {
    require_active(actor)?;

    if !actor.is_admin() {
        return Err(AuthzError::AdminRequired(message));
    }

    Ok(())
}

/// Turns a denied update into the matching error
pub fn require_task_update(
    actor: &Actor,
    task: &Task,
    changed_fields: &BTreeSet<String>,
) -> Result<(), AuthzError> {
    let access = task_update_access(actor, task);

    match access {
        _ if access.permits(changed_fields) => Ok(()),
        TaskAccess::FieldRestricted(allowed) => Err(AuthzError::RestrictedFields {
            allowed: allowed.join(", "),
            rejected: access
                .rejected_fields(changed_fields)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }),
        _ => Err(AuthzError::NotAssignee(
            "Only admin or assigned user (for status) can update task.",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;
    use chrono::Utc;

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    fn user() -> Actor {
        Actor::new(Uuid::new_v4(), Role::User)
    }

    fn inactive(actor: Actor) -> Actor {
        Actor {
            is_active: false,
            ..actor
        }
    }

    fn task_for(assignee: &Actor) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Quarterly report".to_string(),
            description: Some("Numbers for Q3".to_string()),
            status: TaskStatus::ToDo,
            assigned_to: assignee.id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fields(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_list_tasks_scope() {
        let admin = admin();
        let user = user();

        assert_eq!(can_list_tasks(&admin), Some(TaskScope::All));
        assert_eq!(can_list_tasks(&user), Some(TaskScope::AssignedTo(user.id)));
        assert_eq!(can_list_tasks(&inactive(user)), None);
        assert_eq!(can_list_tasks(&inactive(admin)), None);
    }

    #[test]
    fn test_only_admins_create_tasks() {
        assert!(can_create_task(&admin()));
        assert!(!can_create_task(&user()));
        assert!(!can_create_task(&inactive(admin())));
    }

    #[test]
    fn test_read_task() {
        let assignee = user();
        let task = task_for(&assignee);

        assert!(can_read_task(&admin(), &task));
        assert!(can_read_task(&assignee, &task));
        assert!(!can_read_task(&user(), &task));
        assert!(!can_read_task(&inactive(assignee), &task));
    }

    #[test]
    fn test_assignee_may_update_status_only() {
        let assignee = user();
        let task = task_for(&assignee);

        assert!(can_update_task(&assignee, &task, &fields(&["status"])));
        assert!(can_update_task(&assignee, &task, &fields(&[])));
        assert!(!can_update_task(&assignee, &task, &fields(&["status", "title"])));
        assert!(!can_update_task(&assignee, &task, &fields(&["title"])));
        assert!(!can_update_task(&assignee, &task, &fields(&["description"])));
        assert!(!can_update_task(&assignee, &task, &fields(&["assigned_to"])));
    }

    #[test]
    fn test_unknown_fields_count_against_assignee() {
        let assignee = user();
        let task = task_for(&assignee);

        assert!(!can_update_task(&assignee, &task, &fields(&["status", "colour"])));
        assert!(!can_update_task(&assignee, &task, &fields(&["id"])));
    }

    #[test]
    fn test_unrelated_user_cannot_update() {
        let task = task_for(&user());

        assert!(!can_update_task(&user(), &task, &fields(&["status"])));
        assert!(!can_update_task(&user(), &task, &fields(&[])));
    }

    #[test]
    fn test_admin_may_update_any_field() {
        let task = task_for(&user());
        let admin = admin();

        assert!(can_update_task(&admin, &task, &fields(&["title", "description", "status", "assigned_to"])));
        assert!(!can_update_task(&inactive(admin), &task, &fields(&["status"])));
    }

    #[test]
    fn test_task_update_access_outcomes() {
        let assignee = user();
        let task = task_for(&assignee);

        assert_eq!(task_update_access(&admin(), &task), TaskAccess::FullAccess);
        assert_eq!(
            task_update_access(&assignee, &task),
            TaskAccess::FieldRestricted(&["status"])
        );
        assert_eq!(task_update_access(&user(), &task), TaskAccess::Denied);
    }

    #[test]
    fn test_admin_assigned_to_task_keeps_full_access() {
        let admin = admin();
        let task = task_for(&admin);
        assert_eq!(task_update_access(&admin, &task), TaskAccess::FullAccess);
    }

    #[test]
    fn test_rejected_fields() {
        let changed = fields(&["description", "status", "title"]);

        assert_eq!(
            TaskAccess::FieldRestricted(ASSIGNEE_WRITABLE_FIELDS).rejected_fields(&changed),
            vec!["description", "title"]
        );
        assert!(TaskAccess::FullAccess.rejected_fields(&changed).is_empty());
        assert_eq!(TaskAccess::Denied.rejected_fields(&changed).len(), 3);
    }

    #[test]
    fn test_require_task_update_errors() {
        let assignee = user();
        let task = task_for(&assignee);

        assert!(require_task_update(&assignee, &task, &fields(&["status"])).is_ok());

        let err = require_task_update(&assignee, &task, &fields(&["status", "title"])).unwrap_err();
        assert_eq!(
            err,
            AuthzError::RestrictedFields {
                allowed: "status".to_string(),
                rejected: vec!["title".to_string()],
            }
        );
        assert!(err.to_string().contains("title"));

        let err = require_task_update(&user(), &task, &fields(&["status"])).unwrap_err();
        assert!(matches!(err, AuthzError::NotAssignee(_)));
    }

    #[test]
    fn test_only_admins_delete_tasks() {
        let assignee = user();
        let task = task_for(&assignee);

        assert!(can_delete_task(&admin(), &task));
        assert!(!can_delete_task(&assignee, &task));
        assert!(!can_delete_task(&user(), &task));
    }

    #[test]
    fn test_comment_scope_hides_instead_of_denying() {
        let assignee = user();
        let task = task_for(&assignee);

        assert_eq!(can_list_comments(&admin(), &task), CommentScope::All);
        assert_eq!(can_list_comments(&assignee, &task), CommentScope::All);
        assert_eq!(can_list_comments(&user(), &task), CommentScope::Hidden);
        assert_eq!(can_list_comments(&inactive(assignee), &task), CommentScope::Hidden);
    }

    #[test]
    fn test_comment_creation() {
        let assignee = user();
        let task = task_for(&assignee);
        let other_task = task_for(&user());

        assert!(can_create_comment(&admin(), &task));
        assert!(can_create_comment(&admin(), &other_task));
        assert!(can_create_comment(&assignee, &task));
        assert!(!can_create_comment(&assignee, &other_task));
        assert!(!can_create_comment(&user(), &task));
    }

    #[test]
    fn test_only_admins_list_users() {
        assert!(can_list_users(&admin()));
        assert!(!can_list_users(&user()));
        assert!(!can_list_users(&inactive(admin())));
    }

    #[test]
    fn test_soft_delete_allowed() {
        assert_eq!(can_soft_delete_user(&admin(), &user()), Ok(()));
        assert_eq!(can_soft_delete_user(&admin(), &admin()), Ok(()));
    }

    #[test]
    fn test_soft_delete_already_inactive() {
        let target = inactive(user());
        assert_eq!(
            can_soft_delete_user(&admin(), &target),
            Err(SoftDeleteDenial::AlreadyInactive)
        );
    }

    #[test]
    fn test_soft_delete_self_denied_even_for_admin() {
        let admin = admin();
        assert_eq!(
            can_soft_delete_user(&admin, &admin),
            Err(SoftDeleteDenial::SelfTarget)
        );

        let user = user();
        assert_eq!(can_soft_delete_user(&user, &user), Err(SoftDeleteDenial::SelfTarget));
    }

    #[test]
    fn test_soft_delete_check_order() {
        // Inactive target is reported before self-target and role
        let user = user();
        assert_eq!(
            can_soft_delete_user(&user, &inactive(user)),
            Err(SoftDeleteDenial::AlreadyInactive)
        );

        assert_eq!(
            can_soft_delete_user(&user, &self::user()),
            Err(SoftDeleteDenial::NotAdmin)
        );
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&admin(), "Only admins can create tasks.").is_ok());
        assert_eq!(
            require_admin(&user(), "Only admins can create tasks."),
            Err(AuthzError::AdminRequired("Only admins can create tasks."))
        );
        assert_eq!(
            require_admin(&inactive(admin()), "Only admins can create tasks."),
            Err(AuthzError::Inactive)
        );
    }

    #[test]
    fn test_actor_from_user() {
        let user = User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            full_name: "Alice".to_string(),
            role: Role::Admin,
            password_hash: String::new(),
            is_active: false,
            date_joined: Utc::now(),
        };

        let actor = Actor::from(&user);
        assert_eq!(actor.id, user.id);
        assert!(actor.is_admin());
        assert!(!actor.is_active);
    }
}
