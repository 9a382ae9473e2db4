use crate::infra::{default_limits, parse_scores, seed_demo_festival};
use arts_fest::error::AppError;
use arts_fest::festival::{
    podium, rank_competition, AdmissionController, Grade, HouseScore, InMemoryFestivalStore,
    InMemoryNotifier, Leaderboard, Podium, ProgramId, QuotaLimits, RankedHouse,
    RegistrationRequest, RegistrationView, ResultService, ScoringService, UserId,
};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the final report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
    /// Stop after the admission walkthrough
    #[arg(long)]
    pub(crate) skip_scoring: bool,
}

#[derive(Args, Debug)]
pub(crate) struct LeaderboardArgs {
    /// Comma separated HOUSE=SCORE pairs, e.g. `Agni=10,Jal=10,Vayu=7`
    #[arg(long, value_parser = parse_score_sheet)]
    pub(crate) scores: ScoreSheet,
    /// Print the ranking as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ScoreSheet(pub(crate) Vec<HouseScore>);

fn parse_score_sheet(raw: &str) -> Result<ScoreSheet, String> {
    parse_scores(raw).map(ScoreSheet)
}

#[derive(Debug, Serialize)]
struct RankingReport<'a> {
    podium: &'a Podium,
    standings: &'a [RankedHouse],
}

#[derive(Debug, Serialize)]
struct DemoReport {
    limits: QuotaLimits,
    admitted: Vec<RegistrationView>,
    refused: Vec<Refusal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    leaderboard: Option<Leaderboard>,
}

#[derive(Debug, Serialize)]
struct Refusal {
    user_id: String,
    program_id: String,
    code: &'static str,
    reason: String,
}

type DemoController = AdmissionController<InMemoryFestivalStore, InMemoryNotifier>;

struct Walkthrough<'a> {
    admission: &'a DemoController,
    quiet: bool,
    admitted: Vec<RegistrationView>,
    refused: Vec<Refusal>,
}

impl Walkthrough<'_> {
    fn single(&mut self, user: &str, request: RegistrationRequest) -> Option<RegistrationView> {
        let program_id = request.program_id.0.clone();
        match self
            .admission
            .register_single(&UserId(user.to_string()), request)
        {
            Ok(view) => {
                self.say(format!(
                    "- {user} -> {program_id}: admitted {} ({}, roster {})",
                    view.registration_id.0,
                    view.status.label(),
                    view.roster_size
                ));
                self.admitted.push(view.clone());
                Some(view)
            }
            Err(err) => {
                self.say(format!("- {user} -> {program_id}: refused {} ({err})", err.code()));
                self.refused.push(Refusal {
                    user_id: user.to_string(),
                    program_id,
                    code: err.code(),
                    reason: err.to_string(),
                });
                None
            }
        }
    }

    fn batch(&mut self, user: &str, requests: Vec<RegistrationRequest>) -> Vec<RegistrationView> {
        let programs: Vec<String> = requests
            .iter()
            .map(|request| request.program_id.0.clone())
            .collect();
        self.say(format!("- {user} batch [{}]", programs.join(", ")));

        match self
            .admission
            .register_batch(&UserId(user.to_string()), requests)
        {
            Ok(batch) => {
                for view in &batch.created {
                    self.say(format!(
                        "    admitted {} -> {}",
                        view.registration_id.0, view.program_id.0
                    ));
                }
                for program_id in &batch.skipped {
                    self.say(format!("    skipped {} (already taking part)", program_id.0));
                }
                if let Some(item) = batch.rejected {
                    self.say(format!(
                        "    stopped at item {} ({}): {}",
                        item.index,
                        item.program_id.0,
                        item.error.code()
                    ));
                    self.refused.push(Refusal {
                        user_id: user.to_string(),
                        program_id: item.program_id.0,
                        code: item.error.code(),
                        reason: item.error.to_string(),
                    });
                }
                self.admitted.extend(batch.created.iter().cloned());
                batch.created
            }
            Err(err) => {
                self.say(format!("    refused {} ({err})", err.code()));
                Vec::new()
            }
        }
    }

    fn say(&self, line: String) {
        if !self.quiet {
            println!("{line}");
        }
    }
}

fn program(id: &str) -> ProgramId {
    ProgramId(id.to_string())
}

fn team(id: &str, name: &str, members: &[&str]) -> RegistrationRequest {
    RegistrationRequest::group(
        program(id),
        name,
        members.iter().map(|member| UserId(member.to_string())).collect(),
    )
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { json, skip_scoring } = args;

    let store = Arc::new(InMemoryFestivalStore::new());
    seed_demo_festival(&store);
    let provider = Arc::new(default_limits());
    let limits = QuotaLimits::resolve(&*provider);

    let admission = AdmissionController::new(
        store.clone(),
        Arc::new(InMemoryNotifier::default()),
        provider,
    );
    let results = ResultService::new(store.clone());
    let scoring = ScoringService::new(store.clone());

    let mut walk = Walkthrough {
        admission: &admission,
        quiet: json,
        admitted: Vec::new(),
        refused: Vec::new(),
    };

    walk.say("Arts fest demo".to_string());
    walk.say(format!(
        "Limits: on-stage solo {} | on-stage group {} | off-stage total {}",
        limits.max_on_stage_solo, limits.max_on_stage_group, limits.max_off_stage_total
    ));
    walk.say("\nAdmissions".to_string());

    let solo = walk.single("s01", RegistrationRequest::solo(program("light-music")));
    let chorus = walk.single("s01", team("group-song", "Agni Voices", &["s02", "s03"]));
    walk.single("s01", RegistrationRequest::solo(program("light-music")));
    walk.single("s04", team("mime", "Mixed Masks", &["s05"]));
    walk.single("s11", RegistrationRequest::solo(program("essay")));
    walk.single("s05", RegistrationRequest::solo(program("kathakali")));
    let jal_solo = walk.single("s05", RegistrationRequest::solo(program("light-music")));
    let vayu_solo = walk.single("s08", RegistrationRequest::solo(program("light-music")));
    let vayu_essay = walk.single("s09", RegistrationRequest::solo(program("essay")));

    walk.say("\nBatch".to_string());
    walk.batch(
        "s02",
        vec![
            team("group-song", "Echo", &["s04"]),
            RegistrationRequest::solo(program("essay")),
            RegistrationRequest::solo(program("pencil-drawing")),
            team("poster", "Big Poster", &["s03", "s04", "s01"]),
            RegistrationRequest::solo(program("mono-act")),
        ],
    );

    let leaderboard = if skip_scoring {
        None
    } else {
        walk.say("\nResults".to_string());
        let graded = [
            (solo, Grade::Winner, true),
            (chorus, Grade::FirstRunnerUp, true),
            (jal_solo, Grade::Winner, true),
            (vayu_solo, Grade::SecondRunnerUp, false),
            (vayu_essay, Grade::Winner, true),
        ];
        for (view, grade, present) in graded {
            let Some(view) = view else { continue };
            store.mark_attendance(&view.registration_id, present);
            results.set_grade(&view.registration_id, Some(grade))?;
            walk.say(format!(
                "- {} ({}): {}{}",
                view.registration_id.0,
                view.program_id.0,
                grade.label(),
                if present { "" } else { ", absent" }
            ));
        }

        let board = scoring.leaderboard()?;
        if !json {
            println!();
            render_ranking(&board.podium, &board.standings);
        }
        Some(board)
    };

    if json {
        let report = DemoReport {
            limits,
            admitted: walk.admitted,
            refused: walk.refused,
            leaderboard,
        };
        print_json(&report)?;
    }

    Ok(())
}

pub(crate) fn run_leaderboard(args: LeaderboardArgs) -> Result<(), AppError> {
    let LeaderboardArgs {
        scores: ScoreSheet(scores),
        json,
    } = args;
    if scores.is_empty() {
        return Err(AppError::Usage("at least one HOUSE=SCORE pair is required".to_string()));
    }

    let podium = podium(&scores);
    let standings = rank_competition(&scores);

    if json {
        print_json(&RankingReport {
            podium: &podium,
            standings: &standings,
        })
    } else {
        render_ranking(&podium, &standings);
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    println!("{rendered}");
    Ok(())
}

fn tier_line(houses: &[HouseScore]) -> String {
    if houses.is_empty() {
        return "-".to_string();
    }
    houses
        .iter()
        .map(|house| format!("{} ({})", house.name, house.score))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_ranking(podium: &Podium, standings: &[RankedHouse]) {
    println!("Podium");
    println!("  1st: {}", tier_line(&podium.rank1));
    println!("  2nd: {}", tier_line(&podium.rank2));
    println!("  3rd: {}", tier_line(&podium.rank3));
    for entry in &podium.rest {
        println!("  #{}: {} ({})", entry.rank, entry.house.name, entry.house.score);
    }

    println!("Standings");
    for entry in standings {
        println!("  {:>2}. {:<12} {:>4}", entry.rank, entry.house.name, entry.house.score);
    }
}
