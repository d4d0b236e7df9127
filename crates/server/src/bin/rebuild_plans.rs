//! Rebuild daily plans once and exit.
//!
//! Usage: cargo run --release --bin rebuild-plans -- [--user ID] [--concurrency N]
//!
//! Without `--user` every schedulable user is swept, exactly like the
//! server's daily timer.

use std::env;

use anyhow::Context;
use chrono::Local;
use server::config::Config;
use server::db;
use server::scheduler;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env();

    let mut user_id: Option<i64> = None;
    let mut concurrency = config.plan_sweep_concurrency;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--user" => {
                let raw = args.get(i + 1).context("--user needs an ID")?;
                user_id = Some(raw.parse().with_context(|| format!("invalid user ID: {raw}"))?);
                i += 2;
            }
            "--concurrency" => {
                concurrency = args
                    .get(i + 1)
                    .and_then(|s| s.parse().ok())
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or(concurrency);
                i += 2;
            }
            other => {
                eprintln!("Usage: {} [--user ID] [--concurrency N]", args[0]);
                anyhow::bail!("unknown argument: {other}");
            }
        }
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let pool = db::pool::create_pool(&config.database_url, config.database_max_connections)
            .await
            .context("connecting to database")?;
        db::pool::run_migrations(&pool)
            .await
            .context("running migrations")?;

        match user_id {
            Some(id) => {
                let plan = scheduler::build_plan_for_user(&pool, id, &Local::now()).await?;
                println!(
                    "User {id}: {} puzzles today (per day {})",
                    plan.today_batch.len(),
                    plan.per_day
                );
            }
            None => {
                let report = scheduler::run_sweep(&pool, concurrency).await?;
                println!(
                    "Swept {} users: {} rebuilt, {} failed",
                    report.users, report.rebuilt, report.failed
                );
            }
        }

        Ok(())
    })
}
