mod cli;

use anyhow::{Context, Result};
use pipegraph_core::{JobStatus, NodeId, StageStatus};
use pipegraph_viewer::graph::VisibleNode;
use pipegraph_viewer::util::config::{self, DataStrategy};
use pipegraph_viewer::Session;
use std::collections::HashMap;
use std::time::Duration;

const FRAME_INTERVAL: Duration = Duration::from_millis(100);

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = cli::parse_args()?;

    let mut cfg = config::load_or_default();
    if let Some(api) = &args.api {
        cfg.api_base_url = api.clone();
    }
    if args.poll {
        cfg.strategy = DataStrategy::Poll;
    }
    if args.write_config {
        let path = config::config_file_path().context("no config directory available")?;
        config::save_to_path(&cfg, &path)?;
        tracing::info!(path = %path.display(), "viewer config written");
    }
    tracing::info!(
        api = %cfg.api_base_url,
        strategy = cfg.strategy.as_str(),
        demo = args.demo,
        "viewer configured"
    );

    let mut session = Session::from_config(&cfg)?;
    let job = if args.demo {
        session.start_demo()
    } else {
        session.start_job(&args.query, args.options()).await?
    };
    tracing::info!(%job, query = %args.query, "tracking job");

    // last (status, progress) logged per stage
    let mut seen: HashMap<NodeId, (StageStatus, u8)> = HashMap::new();
    let mut last_overall = None;
    let mut frame = tokio::time::interval(FRAME_INTERVAL);

    loop {
        frame.tick().await;
        let done = session.pump();

        for stage in session.stages() {
            let now = (stage.status, stage.progress);
            if seen.get(&stage.id) != Some(&now) {
                tracing::info!(
                    stage = %stage.display_name,
                    status = ?stage.status,
                    progress = stage.progress,
                    thought = stage.thought.as_deref().unwrap_or(""),
                    "stage update"
                );
                seen.insert(stage.id.clone(), now);
            }
        }
        let job_state = session.job();
        if last_overall != Some(job_state.overall_progress()) {
            tracing::info!(
                progress = job_state.overall_progress(),
                status = ?job_state.status(),
                connected = job_state.is_connected(),
                "overall progress"
            );
            last_overall = Some(job_state.overall_progress());
        }

        if done.is_some() {
            break;
        }
        if job_state.status() == JobStatus::Failed {
            anyhow::bail!(
                "job {job} failed: {}",
                job_state.last_error().unwrap_or("unknown error")
            );
        }
    }

    if let Some(report) = session.final_report() {
        println!("{report}\n");
    }
    let view = session.graph().view();
    if view.is_empty() {
        println!("(no mind map)");
    }
    for node in &view {
        println!("{}", outline_line(node));
    }
    Ok(())
}

fn outline_line(node: &VisibleNode) -> String {
    let marker = match (node.has_children, node.expanded) {
        (false, _) => ' ',
        (true, true) => '-',
        (true, false) => '+',
    };
    format!(
        "{}{marker} {} [{:?}] ({:.0}, {:.0})",
        "  ".repeat(node.depth),
        node.label,
        node.kind,
        node.position.x,
        node.position.y
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegraph_core::NodeKind;
    use pipegraph_viewer::graph::Point;

    #[test]
    fn outline_marks_collapsed_parents() {
        let node = VisibleNode {
            id: NodeId::from("mol_semaglutide"),
            label: "Semaglutide".into(),
            kind: NodeKind::Molecule,
            depth: 1,
            position: Point::new(220.0, 45.0),
            expanded: false,
            has_children: true,
        };
        assert_eq!(outline_line(&node), "  + Semaglutide [Molecule] (220, 45)");
    }
}
