use log::info;
use serde::Deserialize;

use super::{check_single_line, Gradebook};
use crate::cipher;
use crate::error::{EntityKind, GradebookError, Result};
use crate::ids::{self, AccountId};
use crate::model::{Account, Profile};

/// Partial profile edit. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn validate_profile(p: &Profile) -> Result<()> {
    check_single_line("first name", &p.first_name)?;
    check_single_line("last name", &p.last_name)?;
    check_single_line("username", &p.username)?;
    if !cipher::is_storable(&p.password) {
        return Err(GradebookError::invalid(
            "password contains characters that cannot be stored",
        ));
    }
    Ok(())
}

impl Gradebook {
    fn allocate_account_id(&mut self, kind: EntityKind) -> Result<AccountId> {
        // Admins and students share one id space so an id names one person.
        let taken = self.admins.len() + self.students.len();
        let (admins, students) = (&self.admins, &self.students);
        ids::allocate_account_id(&mut self.rng, kind, taken, |id| {
            admins.contains(id) || students.contains(id)
        })
    }

    pub fn register_admin(&mut self, profile: Profile) -> Result<AccountId> {
        validate_profile(&profile)?;
        let id = self.allocate_account_id(EntityKind::Administrator)?;
        self.admins.insert(Account::administrator(id, profile));
        info!("registered administrator {id}");
        Ok(id)
    }

    pub fn register_student(&mut self, profile: Profile) -> Result<AccountId> {
        validate_profile(&profile)?;
        let id = self.allocate_account_id(EntityKind::Student)?;
        self.students.insert(Account::student(id, profile));
        info!("registered student {id}");
        Ok(id)
    }

    /// An empty administrator registry means the next login creates the root.
    pub fn needs_bootstrap(&self) -> bool {
        self.admins.is_empty()
    }

    pub fn bootstrap_admin(&mut self, profile: Profile) -> Result<AccountId> {
        if !self.needs_bootstrap() {
            return Err(GradebookError::invalid(
                "an administrator already exists; log in instead",
            ));
        }
        self.register_admin(profile)
    }

    /// Credential check used by the login flow. First match wins.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<AccountId> {
        self.admins
            .iter()
            .find(|a| a.profile.username == username && a.profile.password == password)
            .map(|a| a.id)
            .ok_or_else(|| GradebookError::invalid("invalid username or password"))
    }

    pub fn update_admin(&mut self, id: AccountId, patch: ProfilePatch) -> Result<()> {
        let account = self.admin_mut(id)?;
        apply_patch(account, patch)
    }

    pub fn update_student(&mut self, id: AccountId, patch: ProfilePatch) -> Result<()> {
        let account = self.student_mut(id)?;
        apply_patch(account, patch)
    }

    /// Removes the account and its links from every classroom it managed.
    pub fn delete_admin(&mut self, id: AccountId) -> Result<Account> {
        let account = self
            .admins
            .remove(id)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Administrator, id))?;
        for classroom in self.classrooms.iter_mut() {
            classroom.admins.retain(|a| *a != id);
        }
        info!("deleted administrator {id}");
        Ok(account)
    }

    /// Unenrolls the student everywhere, then removes the account.
    pub fn delete_student(&mut self, id: AccountId) -> Result<Account> {
        self.student(id)?;
        let enrolled: Vec<_> = self
            .classrooms
            .iter()
            .filter(|c| c.roster.contains(id))
            .map(|c| c.id)
            .collect();
        for classroom in enrolled {
            self.unenroll_student(classroom, id)?;
        }
        let account = self
            .students
            .remove(id)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Student, id))?;
        info!("deleted student {id}");
        Ok(account)
    }
}

fn apply_patch(account: &mut Account, patch: ProfilePatch) -> Result<()> {
    let mut next = account.profile.clone();
    if let Some(v) = patch.first_name {
        next.first_name = v;
    }
    if let Some(v) = patch.last_name {
        next.last_name = v;
    }
    if let Some(v) = patch.username {
        next.username = v;
    }
    if let Some(v) = patch.password {
        next.password = v;
    }
    validate_profile(&next)?;
    account.profile = next;
    Ok(())
}
