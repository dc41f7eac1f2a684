//! Subcommand implementations.

use chrono::Utc;
use clap::Args;
use dormgrade_core::model::now_epoch_ms;
use dormgrade_core::repo::actor_repo::ActorRepository;
use dormgrade_core::service::member_service::MemberService;
use dormgrade_core::{
    next_run_after, open_db, parse_capability, Actor, CoreConfig, GradingJobError, GradingSummary,
    MemberOutcome, MonthlyGradingJob, Period, PermissionResolver, Role, SqliteStore,
};
use log::{error, info};
use rusqlite::Connection;

#[derive(Args, Debug)]
pub struct CapabilityArgs {
    /// Username of the administrator performing the change
    #[arg(long)]
    pub admin: String,

    /// Username of the actor receiving or losing the capability
    #[arg(long)]
    pub actor: String,

    /// TASK_VERIFIER or DISCIPLINE_OFFICER
    #[arg(long)]
    pub capability: String,
}

fn open(config: &CoreConfig) -> Result<Connection, String> {
    open_db(&config.db_path)
        .map_err(|err| format!("failed to open `{}`: {err}", config.db_path.display()))
}

fn store(conn: &Connection) -> Result<SqliteStore<'_>, String> {
    SqliteStore::try_new(conn).map_err(|err| err.to_string())
}

fn actor_by_username(store: SqliteStore<'_>, username: &str) -> Result<Actor, String> {
    store
        .find_actor_by_username(username.trim())
        .map_err(|err| err.to_string())?
        .ok_or_else(|| format!("unknown actor `{username}`"))
}

pub fn run_grading(config: &CoreConfig, period: Option<&str>) -> Result<(), String> {
    let conn = open(config)?;
    let job = MonthlyGradingJob::new(store(&conn)?).with_member_budget(config.member_budget());
    let summary = match period {
        Some(text) => {
            let period = Period::parse(text).map_err(|err| err.to_string())?;
            job.grade_period(period)
        }
        None => job.run_monthly_grading(Utc::now()),
    }
    .map_err(|err| err.to_string())?;
    print_summary(&summary);
    if summary.failed > 0 {
        return Err(format!("{} member(s) failed to grade", summary.failed));
    }
    Ok(())
}

/// Runs forever; each wakeup grades the month that just ended.
///
/// A `run-grading` started elsewhere against the same database holds the
/// grading lease, and this loop logs the wakeup as skipped.
pub fn schedule(config: &CoreConfig) -> Result<(), String> {
    let conn = open(config)?;
    let job = MonthlyGradingJob::new(store(&conn)?).with_member_budget(config.member_budget());
    loop {
        let now = Utc::now();
        let next_run = next_run_after(now);
        info!("event=grading_schedule module=cli status=waiting next_run={}", next_run.to_rfc3339());
        // Already past the boundary when `to_std` fails on a negative delta.
        if let Ok(wait) = (next_run - now).to_std() {
            std::thread::sleep(wait);
        }
        match job.run_monthly_grading(Utc::now()) {
            Ok(summary) => print_summary(&summary),
            Err(GradingJobError::AlreadyRunning) => {
                info!("event=grading_schedule module=cli status=skipped reason=already_running");
            }
            Err(err) => {
                error!("event=grading_schedule module=cli status=error error={err}");
            }
        }
    }
}

pub fn grant(config: &CoreConfig, args: &CapabilityArgs) -> Result<(), String> {
    let conn = open(config)?;
    let store = store(&conn)?;
    let capability = parse_capability(args.capability.trim()).map_err(|err| err.to_string())?;
    let admin = actor_by_username(store, &args.admin)?;
    let target = actor_by_username(store, &args.actor)?;
    let grant = PermissionResolver::new(store)
        .grant_capability(&admin, target.id, capability, now_epoch_ms())
        .map_err(|err| err.to_string())?;
    println!("granted {} to {} ({})", grant.capability, target.username, grant.id);
    Ok(())
}

pub fn revoke(config: &CoreConfig, args: &CapabilityArgs) -> Result<(), String> {
    let conn = open(config)?;
    let store = store(&conn)?;
    let capability = parse_capability(args.capability.trim()).map_err(|err| err.to_string())?;
    let admin = actor_by_username(store, &args.admin)?;
    let target = actor_by_username(store, &args.actor)?;
    PermissionResolver::new(store)
        .revoke_capability(&admin, target.id, capability, now_epoch_ms())
        .map_err(|err| err.to_string())?;
    println!("revoked {} from {}", capability, target.username);
    Ok(())
}

pub fn capabilities(config: &CoreConfig, username: &str) -> Result<(), String> {
    let conn = open(config)?;
    let store = store(&conn)?;
    let actor = actor_by_username(store, username)?;
    if actor.is_admin() {
        println!("{} is an administrator (all capabilities)", actor.username);
        return Ok(());
    }
    let grants = PermissionResolver::new(store)
        .list_capabilities(actor.id)
        .map_err(|err| err.to_string())?;
    if grants.is_empty() {
        println!("{} has no granted capabilities", actor.username);
    }
    for grant in grants {
        println!("{}\t{}", grant.capability, grant.capability.description());
    }
    Ok(())
}

pub fn register_actor(config: &CoreConfig, username: &str, role: &str) -> Result<(), String> {
    let role = Role::parse(role.trim()).map_err(|err| err.to_string())?;
    let conn = open(config)?;
    let actor = MemberService::new(store(&conn)?)
        .register_actor(username, role)
        .map_err(|err| err.to_string())?;
    println!("{}\t{}\t{}", actor.id, actor.username, actor.role.as_str());
    Ok(())
}

pub fn enroll(
    config: &CoreConfig,
    username: &str,
    full_name: &str,
    division: &str,
) -> Result<(), String> {
    let conn = open(config)?;
    let store = store(&conn)?;
    let actor = actor_by_username(store, username)?;
    let member = MemberService::new(store)
        .enroll_member(actor.id, full_name, division, now_epoch_ms())
        .map_err(|err| err.to_string())?;
    println!("{}\t{}", member.id, member.status.as_str());
    Ok(())
}

pub fn show_config(config: &CoreConfig) {
    println!("db_path={}", config.db_path.display());
    println!("log_level={}", config.log_level);
    match &config.log_dir {
        Some(dir) => println!("log_dir={}", dir.display()),
        None => println!("log_dir=<stderr>"),
    }
    println!("member_budget_ms={}", config.member_budget_ms);
}

fn print_summary(summary: &GradingSummary) {
    println!(
        "period={} graded={} failed={} skipped={}",
        summary.period, summary.graded, summary.failed, summary.skipped
    );
    for outcome in &summary.outcomes {
        match outcome {
            MemberOutcome::Graded {
                member_id, result, ..
            } => println!("{member_id}\t{}\t{:.2}", result.grade, result.final_score),
            MemberOutcome::Failed { member_id, error } => {
                println!("{member_id}\tFAILED\t{error}")
            }
            MemberOutcome::Skipped {
                member_id,
                elapsed_ms,
            } => println!("{member_id}\tSKIPPED\t{elapsed_ms}ms"),
        }
    }
}
