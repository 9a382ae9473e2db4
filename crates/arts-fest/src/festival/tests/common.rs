use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::StaticConfigProvider;
use crate::festival::admission::{AdmissionController, RegistrationRequest};
use crate::festival::domain::{
    Grade, House, HouseId, Participation, Program, ProgramCategory, ProgramId, ProgramOccupancy,
    ProgramType, Registration, RegistrationDraft, RegistrationId, RegistrationStatus, Role, User,
    UserId,
};
use crate::festival::memory::{InMemoryFestivalStore, InMemoryNotifier};
use crate::festival::repository::{
    FestivalRepository, Notifier, NotifyError, RegistrationNotice, RepositoryError,
};
use crate::festival::results::ResultService;
use crate::festival::router::{festival_router, FestivalState};
use crate::festival::scoring::ScoringService;

pub(super) const GROUP_SONG: &str = "group-song";
pub(super) const SOLO_DANCE: &str = "solo-dance";
pub(super) const ESSAY: &str = "essay";
pub(super) const POSTER: &str = "poster";
pub(super) const RETIRED: &str = "retired-mime";

pub(super) fn uid(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn pid(id: &str) -> ProgramId {
    ProgramId(id.to_string())
}

pub(super) fn hid(id: &str) -> HouseId {
    HouseId(id.to_string())
}

pub(super) fn user(id: &str, house: Option<&str>) -> User {
    User {
        id: uid(id),
        name: id.to_string(),
        house_id: house.map(hid),
        role: Role::Student,
    }
}

pub(super) fn program(
    id: &str,
    kind: ProgramType,
    category: ProgramCategory,
    min_members: u32,
    max_members: u32,
) -> Program {
    Program {
        id: pid(id),
        name: id.replace('-', " "),
        kind,
        category,
        min_members,
        max_members,
        is_active: true,
    }
}

/// Three houses, a handful of students and one program per quota bucket.
pub(super) fn seeded_store() -> InMemoryFestivalStore {
    let store = InMemoryFestivalStore::new();
    for (id, color) in [("red", "#d62828"), ("blue", "#1d3557"), ("green", "#2a9d8f")] {
        store.insert_house(House {
            id: hid(id),
            name: format!("{id} house"),
            color: color.to_string(),
        });
    }

    for (id, house) in [
        ("amal", Some("red")),
        ("binu", Some("red")),
        ("chitra", Some("red")),
        ("dev", Some("red")),
        ("esha", Some("red")),
        ("farid", Some("blue")),
        ("gita", Some("blue")),
        ("hari", None),
    ] {
        store.insert_user(user(id, house));
    }

    store.insert_program(program(
        GROUP_SONG,
        ProgramType::Group,
        ProgramCategory::OnStage,
        2,
        4,
    ));
    store.insert_program(program(
        SOLO_DANCE,
        ProgramType::Solo,
        ProgramCategory::OnStage,
        1,
        1,
    ));
    store.insert_program(program(ESSAY, ProgramType::Solo, ProgramCategory::OffStage, 1, 1));
    store.insert_program(program(
        POSTER,
        ProgramType::Group,
        ProgramCategory::OffStage,
        2,
        3,
    ));
    let mut retired = program(RETIRED, ProgramType::Solo, ProgramCategory::OnStage, 1, 1);
    retired.is_active = false;
    store.insert_program(retired);

    store
}

pub(super) fn limits(on_stage_solo: u32, on_stage_group: u32, off_stage_total: u32) -> StaticConfigProvider {
    StaticConfigProvider::with([
        ("max_on_stage_solo", on_stage_solo),
        ("max_on_stage_group", on_stage_group),
        ("max_off_stage_total", off_stage_total),
    ])
}

pub(super) struct Festival<R, N> {
    pub(super) store: Arc<R>,
    pub(super) notifier: Arc<N>,
    pub(super) limits: Arc<StaticConfigProvider>,
    pub(super) admission: AdmissionController<R, N>,
    pub(super) results: ResultService<R>,
    pub(super) scoring: ScoringService<R>,
}

pub(super) fn festival_with<R, N>(store: R, notifier: N, limits: StaticConfigProvider) -> Festival<R, N>
where
    R: FestivalRepository + 'static,
    N: Notifier + 'static,
{
    let store = Arc::new(store);
    let notifier = Arc::new(notifier);
    let limits = Arc::new(limits);
    Festival {
        admission: AdmissionController::new(store.clone(), notifier.clone(), limits.clone()),
        results: ResultService::new(store.clone()),
        scoring: ScoringService::new(store.clone()),
        store,
        notifier,
        limits,
    }
}

pub(super) fn build_festival(
    on_stage_solo: u32,
    on_stage_group: u32,
    off_stage_total: u32,
) -> Festival<InMemoryFestivalStore, InMemoryNotifier> {
    festival_with(
        seeded_store(),
        InMemoryNotifier::default(),
        limits(on_stage_solo, on_stage_group, off_stage_total),
    )
}

pub(super) fn team(program_id: &str, name: &str, members: &[&str]) -> RegistrationRequest {
    RegistrationRequest::group(pid(program_id), name, members.iter().map(|id| uid(id)).collect())
}

pub(super) fn solo(program_id: &str) -> RegistrationRequest {
    RegistrationRequest::solo(pid(program_id))
}

/// Registers `leader` for a solo program, marks it present and grades it.
pub(super) fn graded_entry(
    festival: &Festival<InMemoryFestivalStore, InMemoryNotifier>,
    leader: &str,
    program_id: &str,
    grade: Grade,
    present: bool,
) -> RegistrationId {
    let view = festival
        .admission
        .register_single(&uid(leader), solo(program_id))
        .expect("entry admitted");
    festival.store.mark_attendance(&view.registration_id, present);
    festival
        .results
        .set_grade(&view.registration_id, Some(grade))
        .expect("grade recorded");
    view.registration_id
}

#[derive(Default)]
pub(super) struct FailingNotifier {
    attempts: Mutex<usize>,
}

impl FailingNotifier {
    pub(super) fn attempts(&self) -> usize {
        *self.attempts.lock().expect("notifier mutex poisoned")
    }
}

impl Notifier for FailingNotifier {
    fn notify(&self, _notice: &RegistrationNotice) -> Result<(), NotifyError> {
        *self.attempts.lock().expect("notifier mutex poisoned") += 1;
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

/// Store where a competing request commits between the admission pre-check and the write.
pub(super) struct RacingStore {
    pub(super) inner: InMemoryFestivalStore,
    pub(super) competitor: Mutex<Option<RegistrationDraft>>,
}

impl RacingStore {
    pub(super) fn new(inner: InMemoryFestivalStore, competitor: RegistrationDraft) -> Self {
        Self {
            inner,
            competitor: Mutex::new(Some(competitor)),
        }
    }
}

impl FestivalRepository for RacingStore {
    fn user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.user(id)
    }

    fn program(&self, id: &ProgramId) -> Result<Option<Program>, RepositoryError> {
        self.inner.program(id)
    }

    fn houses(&self) -> Result<Vec<House>, RepositoryError> {
        self.inner.houses()
    }

    fn registration(&self, id: &RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        self.inner.registration(id)
    }

    fn registrations(&self) -> Result<Vec<Registration>, RepositoryError> {
        self.inner.registrations()
    }

    fn members_of(&self, id: &RegistrationId) -> Result<Vec<UserId>, RepositoryError> {
        self.inner.members_of(id)
    }

    fn participations(&self, user_id: &UserId) -> Result<Vec<Participation>, RepositoryError> {
        self.inner.participations(user_id)
    }

    fn occupancy(&self, program_id: &ProgramId) -> Result<ProgramOccupancy, RepositoryError> {
        self.inner.occupancy(program_id)
    }

    fn create_registrations(
        &self,
        drafts: &[RegistrationDraft],
    ) -> Result<Vec<Registration>, RepositoryError> {
        let competitor = self.competitor.lock().expect("race mutex poisoned").take();
        if let Some(competitor) = competitor {
            self.inner.create_registrations(&[competitor])?;
        }
        self.inner.create_registrations(drafts)
    }

    fn update_grade(
        &self,
        id: &RegistrationId,
        grade: Option<Grade>,
    ) -> Result<Registration, RepositoryError> {
        self.inner.update_grade(id, grade)
    }

    fn update_status(
        &self,
        id: &RegistrationId,
        status: RegistrationStatus,
    ) -> Result<Registration, RepositoryError> {
        self.inner.update_status(id, status)
    }

    fn has_present_attendance(&self, id: &RegistrationId) -> Result<bool, RepositoryError> {
        self.inner.has_present_attendance(id)
    }
}

pub(super) struct UnavailableStore;

impl FestivalRepository for UnavailableStore {
    fn user(&self, _id: &UserId) -> Result<Option<User>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn program(&self, _id: &ProgramId) -> Result<Option<Program>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn houses(&self) -> Result<Vec<House>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn registration(&self, _id: &RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn registrations(&self) -> Result<Vec<Registration>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn members_of(&self, _id: &RegistrationId) -> Result<Vec<UserId>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn participations(&self, _user_id: &UserId) -> Result<Vec<Participation>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn occupancy(&self, _program_id: &ProgramId) -> Result<ProgramOccupancy, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn create_registrations(
        &self,
        _drafts: &[RegistrationDraft],
    ) -> Result<Vec<Registration>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_grade(
        &self,
        _id: &RegistrationId,
        _grade: Option<Grade>,
    ) -> Result<Registration, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_status(
        &self,
        _id: &RegistrationId,
        _status: RegistrationStatus,
    ) -> Result<Registration, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn has_present_attendance(&self, _id: &RegistrationId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_for(
    festival: &Festival<InMemoryFestivalStore, InMemoryNotifier>,
) -> axum::Router {
    let state = FestivalState {
        admission: Arc::new(AdmissionController::new(
            festival.store.clone(),
            festival.notifier.clone(),
            festival.limits.clone(),
        )),
        results: Arc::new(ResultService::new(festival.store.clone())),
        scoring: Arc::new(ScoringService::new(festival.store.clone())),
    };
    festival_router(state)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
