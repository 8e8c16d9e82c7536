mod config;
mod logging;

use std::process::ExitCode;

use anyhow::Context;
use checkin_engine::{cookies_from_env, notifier_from_env, run_site, SessionSettings};
use checkin_logging::{checkin_error, checkin_info};
use clap::Parser;

use config::Args;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    logging::initialize(args.log, args.verbose);

    let profiles =
        config::load_profiles(args.profiles.as_deref()).context("loading site profiles")?;
    if args.list {
        for profile in &profiles {
            println!(
                "{}\t{}\t{}\t{}",
                profile.name, profile.display_name, profile.base_url, profile.credential_env
            );
        }
        return Ok(ExitCode::SUCCESS);
    }
    let profiles = config::select_profiles(profiles, &args.sites)?;

    let notifier = notifier_from_env();
    let settings = SessionSettings::default();
    let mut failed = Vec::new();

    // One site at a time; each run opens and closes its own session.
    for profile in &profiles {
        let cookies = cookies_from_env(&profile.credential_env);
        let report = run_site(profile, cookies, &settings, notifier.as_ref()).await;
        if !report.is_success() {
            failed.push(profile.name.as_str());
        }
    }

    if failed.is_empty() {
        checkin_info!("all {} runs completed", profiles.len());
        Ok(ExitCode::SUCCESS)
    } else {
        checkin_error!("login failed for: {}", failed.join(", "));
        Ok(ExitCode::FAILURE)
    }
}
