use std::sync::Arc;

use weekly_report::{
    WeeklyReports,
    actor::Actor,
    attachment::{FileMeta, MemoryBlobStore},
    config::Config,
    logging,
    messaging::Message,
    report::ReportDraft,
    utils::{hrp, new_uuid_to_bech32},
    week,
};

// One week of a team's review cycle against a scratch database.
fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config {
            db_path: std::env::temp_dir().join("weekly-report-walkthrough"),
            ..Config::default()
        },
    };
    logging::init(&config.log_filter);

    let app = WeeklyReports::open(&config, Arc::new(MemoryBlobStore::new()))?;

    let admin = app.directory.register(Actor::admin(new_uuid_to_bech32(hrp::USER)?))?;
    let lead = app.directory.register(Actor::supervisor(new_uuid_to_bech32(hrp::USER)?))?;
    let dev = app.directory.register(Actor::employee(
        new_uuid_to_bech32(hrp::USER)?,
        Some(lead.id().to_owned()),
    ))?;

    let today = chrono::Utc::now().date_naive();
    let Some(week_start) = week::week_start_containing(today) else {
        anyhow::bail!("no week contains {today}");
    };

    let report = app.reports.create(
        &dev,
        ReportDraft::new(week_start)
            .set_accomplished_tasks("Finished the export pipeline and its tests")
            .set_next_week_plans("Roll the pipeline out to staging")
            .set_hours_worked(40.0),
    )?;
    app.attachments.upload(
        &report.id,
        &dev,
        FileMeta::new("timesheet.csv", "text/csv"),
        b"day,hours\nfri,8\nmon,8\ntue,8\nwed,8\nthu,8\n",
    )?;
    app.reports.submit(&report.id, &dev)?;

    let question = app.messages.send(
        &lead,
        Message::new(dev.id(), "Export pipeline", "Does it handle empty batches?")
            .about_report(&report.id),
    )?;
    app.messages.send(
        &dev,
        Message::new(lead.id(), "Re: Export pipeline", "Yes, covered by a test")
            .in_reply_to(&question.id),
    )?;

    let report = app.reports.approve(&report.id, &lead, Some("Nice work"))?;
    println!("{:#?}", report);

    for note in app.messages.list_thread(&question.id, &dev)? {
        println!("{} -> {}: {}", note.sender_id, note.recipient_id, note.body);
    }
    println!("unread for dev: {}", app.messages.unread_count(&dev)?);
    println!("this week: {}", app.reports.current_week(&admin, today)?.len());

    Ok(())
}
