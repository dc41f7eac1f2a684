use dormgrade_core::model::boarding::{BoardingRecord, NewBoardingRecord};
use dormgrade_core::model::task::{NewTask, Task, TaskFrequency, TaskStatus};
use dormgrade_core::repo::actor_repo::ActorRepository;
use dormgrade_core::repo::boarding_repo::BoardingRepository;
use dormgrade_core::repo::member_repo::MemberRepository;
use dormgrade_core::repo::task_repo::TaskRepository;
use dormgrade_core::service::aggregate::{ActivityAggregator, DEFAULT_DISCIPLINE_SCORE};
use dormgrade_core::{
    open_db_in_memory, Actor, MemberProfile, Period, Role, ServiceError, SqliteStore,
};
use uuid::Uuid;

fn member(store: SqliteStore<'_>, username: &str) -> (Actor, MemberProfile) {
    let actor = Actor::new(username, Role::Member).unwrap();
    store.create_actor(&actor).unwrap();
    let profile = MemberProfile::new(actor.id, "Santri", "Media", 0);
    store.create_member(&profile).unwrap();
    (actor, profile)
}

fn task(store: SqliteStore<'_>, member: &MemberProfile, deadline: i64, status: TaskStatus) {
    let mut task = Task::new(
        member.id,
        NewTask {
            title: "Edit weekly video".to_string(),
            frequency: TaskFrequency::Weekly,
            deadline,
            constraints: "none".to_string(),
            solutions: "none".to_string(),
            proof_link: None,
        },
    )
    .unwrap();
    task.status = status;
    store.create_task(&task).unwrap();
}

fn boarding(
    store: SqliteStore<'_>,
    member: &MemberProfile,
    officer: &Actor,
    period: Period,
    score: f64,
    created_at: i64,
) {
    let record = BoardingRecord::new(
        NewBoardingRecord {
            member_id: member.id,
            period,
            discipline_score: score,
            liabilities: None,
            achievements: None,
            notes: None,
        },
        officer.id,
        created_at,
    )
    .unwrap();
    store.create_boarding_record(&record).unwrap();
}

fn officer(store: SqliteStore<'_>) -> Actor {
    let officer = Actor::new("officer", Role::Administrator).unwrap();
    store.create_actor(&officer).unwrap();
    officer
}

#[test]
fn empty_period_defaults_to_zero_ratio_and_full_discipline() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let (_, profile) = member(store, "santri01");
    let period = Period::new(2024, 2).unwrap();

    let summary = ActivityAggregator::new(store)
        .aggregate(profile.id, period)
        .unwrap();
    assert_eq!(summary.task_ratio, 0.0);
    assert_eq!(summary.discipline_score, DEFAULT_DISCIPLINE_SCORE);
    assert_eq!(summary.task_count, 0);
    assert!(!summary.boarding_record_found);
}

#[test]
fn ratio_counts_completed_tasks_inside_half_open_window() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let (_, profile) = member(store, "santri01");
    let period = Period::new(2024, 2).unwrap();
    let start = period.start_epoch_ms();
    let end = period.end_epoch_ms();

    task(store, &profile, start, TaskStatus::Completed);
    task(store, &profile, start + 86_400_000, TaskStatus::Pending);
    task(store, &profile, end - 1, TaskStatus::Completed);
    task(store, &profile, end - 2, TaskStatus::Rejected);
    // Outside the window on both sides.
    task(store, &profile, start - 1, TaskStatus::Completed);
    task(store, &profile, end, TaskStatus::Completed);

    let summary = ActivityAggregator::new(store)
        .aggregate(profile.id, period)
        .unwrap();
    assert_eq!(summary.task_count, 4);
    assert_eq!(summary.completed_count, 2);
    assert!((summary.task_ratio - 0.5).abs() < 1e-9);
}

#[test]
fn tasks_of_other_members_are_ignored() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let (_, first) = member(store, "santri01");
    let (_, second) = member(store, "santri02");
    let period = Period::new(2024, 2).unwrap();

    task(store, &second, period.start_epoch_ms(), TaskStatus::Completed);

    let summary = ActivityAggregator::new(store)
        .aggregate(first.id, period)
        .unwrap();
    assert_eq!(summary.task_count, 0);
}

#[test]
fn boarding_record_of_the_period_sets_discipline_score() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let officer = officer(store);
    let (_, profile) = member(store, "santri01");
    let period = Period::new(2024, 2).unwrap();

    boarding(store, &profile, &officer, period.previous(), 10.0, 1);
    boarding(store, &profile, &officer, period, 72.5, 2);

    let summary = ActivityAggregator::new(store)
        .aggregate(profile.id, period)
        .unwrap();
    assert!(summary.boarding_record_found);
    assert_eq!(summary.discipline_score, 72.5);
}

#[test]
fn duplicate_boarding_records_resolve_to_most_recent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let officer = officer(store);
    let (_, profile) = member(store, "santri01");
    let period = Period::new(2024, 2).unwrap();

    boarding(store, &profile, &officer, period, 90.0, 2_000);
    boarding(store, &profile, &officer, period, 40.0, 1_000);
    assert_eq!(
        store
            .find_boarding_record(profile.id, period)
            .unwrap()
            .unwrap()
            .discipline_score,
        90.0
    );

    // Same timestamp: the later insert wins.
    boarding(store, &profile, &officer, period, 55.0, 2_000);
    let summary = ActivityAggregator::new(store)
        .aggregate(profile.id, period)
        .unwrap();
    assert_eq!(summary.discipline_score, 55.0);
}

#[test]
fn unknown_member_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let missing = Uuid::new_v4();

    let err = ActivityAggregator::new(store)
        .aggregate(missing, Period::new(2024, 2).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { entity: "member", id } if id == missing
    ));
}
