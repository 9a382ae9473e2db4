//! Mutex-backed reference implementation of [`FestivalRepository`].
//!
//! Every trait call takes the single state lock, so each call observes and mutates a consistent
//! snapshot. Admission still reads and writes in separate calls, which is exactly the window the
//! write-time uniqueness checks in `create_registrations` close.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use super::domain::{
    Grade, GroupMember, House, HouseId, Participation, ParticipationRole, Program, ProgramId,
    ProgramOccupancy, Registration, RegistrationDraft, RegistrationId, RegistrationStatus, User,
    UserId,
};
use super::repository::{
    FestivalRepository, Notifier, NotifyError, RegistrationNotice, RepositoryError,
};

#[derive(Debug, Default)]
struct StoreState {
    users: BTreeMap<UserId, User>,
    houses: Vec<House>,
    programs: BTreeMap<ProgramId, Program>,
    registrations: Vec<Registration>,
    members: Vec<GroupMember>,
    attendance: BTreeMap<RegistrationId, Vec<bool>>,
    next_registration: u64,
}

impl StoreState {
    fn registration_mut(&mut self, id: &RegistrationId) -> Option<&mut Registration> {
        self.registrations.iter_mut().find(|record| &record.id == id)
    }

    fn active_registrations_for<'a>(
        &'a self,
        program_id: &'a ProgramId,
    ) -> impl Iterator<Item = &'a Registration> + 'a {
        self.registrations
            .iter()
            .filter(move |record| &record.program_id == program_id && record.status.is_active())
    }

    fn occupancy(&self, program_id: &ProgramId) -> ProgramOccupancy {
        let mut occupancy = ProgramOccupancy::default();
        for record in self.active_registrations_for(program_id) {
            occupancy.leaders.push(record.user_id.clone());
            occupancy.members.extend(
                self.members
                    .iter()
                    .filter(|member| member.registration_id == record.id)
                    .map(|member| member.user_id.clone()),
            );
        }
        occupancy
    }

    fn check_drafts(&self, drafts: &[RegistrationDraft]) -> Result<(), RepositoryError> {
        let mut pending: BTreeMap<&ProgramId, BTreeSet<&UserId>> = BTreeMap::new();

        for draft in drafts {
            let occupancy = self.occupancy(&draft.program_id);
            let claimed = pending.entry(&draft.program_id).or_default();

            let mut roster = BTreeSet::new();
            for user_id in std::iter::once(&draft.user_id).chain(draft.member_ids.iter()) {
                if !roster.insert(user_id) {
                    return Err(RepositoryError::Conflict(format!(
                        "group_members(registration_id, user_id): {} listed twice",
                        user_id.0
                    )));
                }
                if occupancy.is_leader(user_id)
                    || occupancy.is_member(user_id)
                    || !claimed.insert(user_id)
                {
                    return Err(RepositoryError::Conflict(format!(
                        "registrations(user_id, program_id): {} already holds {}",
                        user_id.0, draft.program_id.0
                    )));
                }
            }
        }

        Ok(())
    }
}

/// In-memory festival store used by the CLI demo, the HTTP service and the test-suite.
#[derive(Debug, Default)]
pub struct InMemoryFestivalStore {
    state: Mutex<StoreState>,
}

impl InMemoryFestivalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_house(&self, house: House) {
        let mut state = self.state();
        state.houses.retain(|existing| existing.id != house.id);
        state.houses.push(house);
    }

    pub fn insert_user(&self, user: User) {
        self.state().users.insert(user.id.clone(), user);
    }

    pub fn insert_program(&self, program: Program) {
        self.state().programs.insert(program.id.clone(), program);
    }

    /// Moves a user to another house. Existing registrations keep the house they were created with.
    pub fn assign_house(&self, user_id: &UserId, house_id: Option<HouseId>) -> bool {
        match self.state().users.get_mut(user_id) {
            Some(user) => {
                user.house_id = house_id;
                true
            }
            None => false,
        }
    }

    pub fn set_program_active(&self, program_id: &ProgramId, is_active: bool) -> bool {
        match self.state().programs.get_mut(program_id) {
            Some(program) => {
                program.is_active = is_active;
                true
            }
            None => false,
        }
    }

    /// Records one attendance mark for a registration.
    pub fn mark_attendance(&self, registration_id: &RegistrationId, present: bool) {
        self.state()
            .attendance
            .entry(registration_id.clone())
            .or_default()
            .push(present);
    }

    pub fn group_members(&self) -> Vec<GroupMember> {
        self.state().members.clone()
    }
}

impl FestivalRepository for InMemoryFestivalStore {
    fn user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state().users.get(id).cloned())
    }

    fn program(&self, id: &ProgramId) -> Result<Option<Program>, RepositoryError> {
        Ok(self.state().programs.get(id).cloned())
    }

    fn houses(&self) -> Result<Vec<House>, RepositoryError> {
        Ok(self.state().houses.clone())
    }

    fn registration(&self, id: &RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        Ok(self
            .state()
            .registrations
            .iter()
            .find(|record| &record.id == id)
            .cloned())
    }

    fn registrations(&self) -> Result<Vec<Registration>, RepositoryError> {
        Ok(self.state().registrations.clone())
    }

    fn members_of(&self, id: &RegistrationId) -> Result<Vec<UserId>, RepositoryError> {
        Ok(self
            .state()
            .members
            .iter()
            .filter(|member| &member.registration_id == id)
            .map(|member| member.user_id.clone())
            .collect())
    }

    fn participations(&self, user_id: &UserId) -> Result<Vec<Participation>, RepositoryError> {
        let state = self.state();
        let mut participations = Vec::new();

        for record in &state.registrations {
            let role = if &record.user_id == user_id {
                ParticipationRole::Leader
            } else if state
                .members
                .iter()
                .any(|member| member.registration_id == record.id && &member.user_id == user_id)
            {
                ParticipationRole::Member
            } else {
                continue;
            };

            let Some(program) = state.programs.get(&record.program_id) else {
                continue;
            };

            participations.push(Participation {
                registration_id: record.id.clone(),
                program_id: record.program_id.clone(),
                kind: program.kind,
                category: program.category,
                role,
                status: record.status,
            });
        }

        Ok(participations)
    }

    fn occupancy(&self, program_id: &ProgramId) -> Result<ProgramOccupancy, RepositoryError> {
        Ok(self.state().occupancy(program_id))
    }

    fn create_registrations(
        &self,
        drafts: &[RegistrationDraft],
    ) -> Result<Vec<Registration>, RepositoryError> {
        let mut state = self.state();
        state.check_drafts(drafts)?;

        let now = Utc::now();
        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            state.next_registration += 1;
            let id = RegistrationId(format!("reg-{:06}", state.next_registration));

            let record = Registration {
                id: id.clone(),
                user_id: draft.user_id.clone(),
                program_id: draft.program_id.clone(),
                house_id: draft.house_id.clone(),
                is_group: draft.is_group,
                group_name: draft.group_name.clone(),
                status: draft.status,
                grade: None,
                created_at: now,
                graded_at: None,
            };

            state
                .members
                .extend(draft.member_ids.iter().map(|user_id| GroupMember {
                    registration_id: id.clone(),
                    user_id: user_id.clone(),
                }));
            state.registrations.push(record.clone());
            created.push(record);
        }

        Ok(created)
    }

    fn update_grade(
        &self,
        id: &RegistrationId,
        grade: Option<Grade>,
    ) -> Result<Registration, RepositoryError> {
        let mut state = self.state();
        let record = state.registration_mut(id).ok_or(RepositoryError::NotFound)?;
        if record.grade != grade {
            record.grade = grade;
            record.graded_at = grade.map(|_| Utc::now());
        }
        Ok(record.clone())
    }

    fn update_status(
        &self,
        id: &RegistrationId,
        status: RegistrationStatus,
    ) -> Result<Registration, RepositoryError> {
        let mut state = self.state();
        let record = state.registration_mut(id).ok_or(RepositoryError::NotFound)?;
        record.status = status;
        Ok(record.clone())
    }

    fn has_present_attendance(&self, id: &RegistrationId) -> Result<bool, RepositoryError> {
        Ok(self
            .state()
            .attendance
            .get(id)
            .map(|marks| marks.iter().any(|present| *present))
            .unwrap_or(false))
    }
}

/// Notifier that keeps every notice it is handed.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    events: Mutex<Vec<RegistrationNotice>>,
}

impl InMemoryNotifier {
    pub fn events(&self) -> Vec<RegistrationNotice> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for InMemoryNotifier {
    fn notify(&self, notice: &RegistrationNotice) -> Result<(), NotifyError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice.clone());
        Ok(())
    }
}
