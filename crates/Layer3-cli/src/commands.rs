//! Subcommand handlers
//!
//! Thin wrappers over `InstanceManager` that own all terminal output. The
//! manager never prints; everything user-facing is formatted here.

use chrono::{DateTime, Utc};
use sprig_foundation::Error;
use sprig_instance::{Instance, InstanceManager, LaunchRequest, SourceOptions, StopOutcome};
use std::path::PathBuf;

pub async fn run(
    manager: &InstanceManager,
    options: SourceOptions,
    repo_path: Option<PathBuf>,
    command: Option<String>,
    port: u16,
    detached: bool,
) -> anyhow::Result<()> {
    let request = LaunchRequest {
        options,
        repo_path,
        command,
        port,
        detached,
    };

    match manager.launch(request).await {
        Ok(instance) if detached => {
            println!("Started instance {} ({})", instance.id, instance.name);
            println!("  pid:     {}", instance.pid);
            println!("  port:    {}", instance.port);
            println!("  logs:    {}", instance.log_path.display());
            println!("  stop it: sprig stop {}", instance.id);
            Ok(())
        }
        Ok(instance) => {
            println!("Instance {} finished", instance.name);
            Ok(())
        }
        Err(Error::ProcessExit { code, .. }) => {
            // Propagate the child's exit status to the shell
            std::process::exit(code);
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn list(manager: &InstanceManager) -> anyhow::Result<()> {
    let instances = manager.list().await?;
    if instances.is_empty() {
        println!("No instances.");
        return Ok(());
    }
    print!("{}", render_table(&instances));
    Ok(())
}

pub async fn stop(manager: &InstanceManager, id: &str) -> anyhow::Result<()> {
    let instance = manager.stop(id).await?;
    println!(
        "Instance {} ({}) is now '{}'",
        instance.id, instance.name, instance.status
    );
    Ok(())
}

pub async fn stop_all(manager: &InstanceManager, project: Option<&str>) -> anyhow::Result<()> {
    let summary = manager.stop_all(project).await?;
    if summary.reports.is_empty() {
        println!("No instances.");
        return Ok(());
    }

    for report in &summary.reports {
        match &report.outcome {
            StopOutcome::Signaled(status) => {
                println!("stopped  {} ({}) -> '{}'", report.id, report.name, status);
            }
            StopOutcome::Skipped(reason) => {
                println!("skipped  {} ({}): {}", report.id, report.name, reason);
            }
            StopOutcome::Failed(reason) => {
                println!("FAILED   {} ({}): {}", report.id, report.name, reason);
            }
        }
    }
    println!(
        "{} stopped, {} skipped, {} failed",
        summary.signaled(),
        summary.skipped(),
        summary.failed()
    );

    if summary.failed() > 0 {
        anyhow::bail!("{} instance(s) could not be stopped", summary.failed());
    }
    Ok(())
}

/// Render instances as a plain aligned table, one row per instance
fn render_table(instances: &[Instance]) -> String {
    let headers = ["ID", "NAME", "STATUS", "PID", "PORT", "STARTED", "STOPPED"];
    let rows: Vec<[String; 7]> = instances
        .iter()
        .map(|inst| {
            [
                inst.id.clone(),
                inst.name.clone(),
                inst.status.to_string(),
                inst.pid.to_string(),
                inst.port.to_string(),
                format_time(Some(inst.start_time)),
                format_time(inst.stop_time),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    for (i, header) in headers.iter().enumerate() {
        out.push_str(&format!("{:<width$}  ", header, width = widths[i]));
    }
    out.push('\n');
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            out.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
        }
        out.push('\n');
    }
    out
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}
