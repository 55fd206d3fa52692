//! Renders synchronization events on the terminal.

use std::{
    sync::mpsc::Receiver,
    thread::{self, JoinHandle},
};

use gavel_events::{SyncEvent, SyncState, SyncSummary};
use nu_ansi_term::Color::{Cyan, Green, Red, Yellow};

use crate::utils::Colored;

pub struct ProgressGuard {
    handle: JoinHandle<()>,
}

impl ProgressGuard {
    /// Waits until every event has been rendered. The sink feeding the
    /// receiver must be dropped first.
    pub fn finish(self) {
        let _ = self.handle.join();
    }
}

pub fn spawn_event_handler(receiver: Receiver<SyncEvent>) -> ProgressGuard {
    let handle = thread::spawn(move || {
        for event in receiver {
            if let Some(line) = render(&event) {
                eprintln!("{line}");
            }
        }
    });
    ProgressGuard { handle }
}

fn render(event: &SyncEvent) -> Option<String> {
    match event {
        SyncEvent::Progress { position, total } if *total > 0 => {
            let percent = (*position as f64 / *total as f64) * 100.0;
            Some(format!(
                "{} {position}/{total} ({percent:.1}%)",
                Colored(Cyan, "walking")
            ))
        }
        SyncEvent::PublishTimedOut { gav } => {
            Some(format!("{} {gav}", Colored(Yellow, "timed out")))
        }
        SyncEvent::Complete { repo_name, summary } => Some(render_summary(repo_name, summary)),
        SyncEvent::StateChanged {
            state: SyncState::Failed,
            repo_name,
        } => Some(format!("{} {repo_name}", Colored(Red, "sync failed"))),
        _ => None,
    }
}

fn render_summary(repo_name: &str, summary: &SyncSummary) -> String {
    let rows = [
        ("visited", summary.visited),
        ("deleted", summary.deleted),
        ("incomplete", summary.incomplete),
        ("unreadable", summary.unreadable),
        ("processed", summary.processed),
        ("checksums created", summary.checksums_created),
        ("skipped as known", summary.skipped_known),
        ("published", summary.published),
        ("publish failed", summary.publish_failed),
        ("timed out", summary.timed_out),
        ("item errors", summary.item_errors),
    ];

    let mut out = format!("{} {repo_name}", Colored(Green, "summary"));
    for (label, count) in rows {
        out.push_str(&format!("\n  {label:<18} {count}"));
    }
    out
}

/// The summary as a JSON object, for `--json` output.
pub fn summary_json(repo_name: &str, summary: &SyncSummary) -> serde_json::Value {
    serde_json::json!({
        "repository": repo_name,
        "visited": summary.visited,
        "deleted": summary.deleted,
        "incomplete": summary.incomplete,
        "unreadable": summary.unreadable,
        "processed": summary.processed,
        "checksums_created": summary.checksums_created,
        "skipped_known": summary.skipped_known,
        "published": summary.published,
        "publish_failed": summary.publish_failed,
        "timed_out": summary.timed_out,
        "item_errors": summary.item_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::set_color;

    #[test]
    fn test_render_progress() {
        set_color(false);
        let line = render(&SyncEvent::Progress {
            position: 250,
            total: 1000,
        })
        .unwrap();
        assert_eq!(line, "walking 250/1000 (25.0%)");
    }

    #[test]
    fn test_render_ignores_per_entry_events() {
        assert!(render(&SyncEvent::Published {
            gav: "org.example:lib:pom:1.0".into()
        })
        .is_none());
    }

    #[test]
    fn test_summary_json() {
        let summary = SyncSummary {
            visited: 3,
            published: 2,
            ..SyncSummary::default()
        };
        let value = summary_json("central", &summary);
        assert_eq!(value["repository"], "central");
        assert_eq!(value["visited"], 3);
        assert_eq!(value["published"], 2);
        assert_eq!(value["timed_out"], 0);
    }
}
