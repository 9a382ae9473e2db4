use arts_fest::config::{ConfigProvider, EnvConfigProvider, StaticConfigProvider};
use arts_fest::festival::{
    House, HouseId, HouseScore, InMemoryFestivalStore, Notifier, NotifyError, Program,
    ProgramCategory, ProgramId, ProgramType, QuotaLimits, RegistrationNotice, Role, User, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Limits used when the environment does not set its own.
pub(crate) fn default_limits() -> StaticConfigProvider {
    let limits = QuotaLimits {
        max_on_stage_solo: 2,
        max_on_stage_group: 2,
        max_off_stage_total: 3,
    };
    StaticConfigProvider::with([
        ("max_on_stage_solo", limits.max_on_stage_solo),
        ("max_on_stage_group", limits.max_on_stage_group),
        ("max_off_stage_total", limits.max_off_stage_total),
    ])
}

/// First provider that knows a key wins.
pub(crate) struct LayeredConfigProvider {
    layers: Vec<Box<dyn ConfigProvider>>,
}

impl LayeredConfigProvider {
    pub(crate) fn new(layers: Vec<Box<dyn ConfigProvider>>) -> Self {
        Self { layers }
    }
}

impl ConfigProvider for LayeredConfigProvider {
    fn get_value(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get_value(key))
    }
}

/// `FESTIVAL_MAX_*` environment variables, backed by [`default_limits`] when `with_defaults`.
///
/// Without defaults an unset limit reads as zero and closes its bucket.
pub(crate) fn limits_provider(with_defaults: bool) -> LayeredConfigProvider {
    let mut layers: Vec<Box<dyn ConfigProvider>> = vec![Box::new(EnvConfigProvider::default())];
    if with_defaults {
        layers.push(Box::new(default_limits()));
    }
    LayeredConfigProvider::new(layers)
}

/// Notifier for the standalone service: every notice becomes a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &RegistrationNotice) -> Result<(), NotifyError> {
        info!(
            template = %notice.template,
            user_id = %notice.user_id.0,
            registration_id = %notice.registration_id.0,
            program_id = notice.details.get("program_id").map(String::as_str).unwrap_or(""),
            "notification dispatched"
        );
        Ok(())
    }
}

pub(crate) const DEMO_HOUSES: [(&str, &str, &str); 3] = [
    ("agni", "Agni", "#e76f51"),
    ("jal", "Jal", "#457b9d"),
    ("vayu", "Vayu", "#8ab17d"),
];

const DEMO_STUDENTS: [(&str, &str, Option<&str>); 11] = [
    ("s01", "Anjali", Some("agni")),
    ("s02", "Basil", Some("agni")),
    ("s03", "Catherine", Some("agni")),
    ("s04", "Dileep", Some("agni")),
    ("s05", "Fathima", Some("jal")),
    ("s06", "Gokul", Some("jal")),
    ("s07", "Hiba", Some("jal")),
    ("s08", "Irfan", Some("vayu")),
    ("s09", "Jyothi", Some("vayu")),
    ("s10", "Kiran", Some("vayu")),
    ("s11", "Lakshmi", None),
];

fn demo_program(
    id: &str,
    name: &str,
    kind: ProgramType,
    category: ProgramCategory,
    members: (u32, u32),
) -> Program {
    Program {
        id: ProgramId(id.to_string()),
        name: name.to_string(),
        kind,
        category,
        min_members: members.0,
        max_members: members.1,
        is_active: true,
    }
}

/// Populates houses, students and the program catalogue used by `demo` and development servers.
pub(crate) fn seed_demo_festival(store: &InMemoryFestivalStore) {
    for (id, name, color) in DEMO_HOUSES {
        store.insert_house(House {
            id: HouseId(id.to_string()),
            name: name.to_string(),
            color: color.to_string(),
        });
    }

    for (id, name, house) in DEMO_STUDENTS {
        store.insert_user(User {
            id: UserId(id.to_string()),
            name: name.to_string(),
            house_id: house.map(|house| HouseId(house.to_string())),
            role: Role::Student,
        });
    }
    store.insert_user(User {
        id: UserId("staff01".to_string()),
        name: "Festival Desk".to_string(),
        house_id: None,
        role: Role::Staff,
    });

    use ProgramCategory::{OffStage, OnStage};
    use ProgramType::{Group, Solo};
    let catalogue = [
        demo_program("light-music", "Light Music", Solo, OnStage, (1, 1)),
        demo_program("mono-act", "Mono Act", Solo, OnStage, (1, 1)),
        demo_program("group-song", "Group Song", Group, OnStage, (3, 6)),
        demo_program("mime", "Mime", Group, OnStage, (2, 8)),
        demo_program("essay", "Essay Writing", Solo, OffStage, (1, 1)),
        demo_program("pencil-drawing", "Pencil Drawing", Solo, OffStage, (1, 1)),
        demo_program("poster", "Poster Design", Group, OffStage, (2, 3)),
    ];
    for program in catalogue {
        store.insert_program(program);
    }

    let mut retired = demo_program("kathakali", "Kathakali", Solo, OnStage, (1, 1));
    retired.is_active = false;
    store.insert_program(retired);
}

/// Parses `HOUSE=SCORE` pairs separated by commas, e.g. `Agni=10,Jal=7`.
pub(crate) fn parse_scores(raw: &str) -> Result<Vec<HouseScore>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (house, score) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected HOUSE=SCORE, got '{pair}'"))?;
            let house = house.trim();
            if house.is_empty() {
                return Err(format!("missing house name in '{pair}'"));
            }
            let score = score
                .trim()
                .parse::<u32>()
                .map_err(|err| format!("failed to parse score in '{pair}' ({err})"))?;
            Ok(HouseScore {
                house_id: HouseId(house.to_string()),
                name: house.to_string(),
                color: String::new(),
                score,
            })
        })
        .collect()
}
