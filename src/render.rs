use crate::sync::SyncEvent;
use crate::util::format_duration;
use serde::Serialize;
use std::time::Duration;

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("failed to serialize json: {}", e),
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ErrorOut<'a> {
    pub code: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
}

pub fn print_json_error(code: &str, message: &str, hint: Option<&str>) {
    let err = ErrorOut { code, message, hint };
    print_json(&err);
}

/// Human-readable progress line for a sync event.
pub fn event_line(event: &SyncEvent) -> String {
    match event {
        SyncEvent::FieldsCreated { count } => format!("created {} field(s)", count),
        SyncEvent::SupertagCreated { name, id } => format!("created supertag #{} ({})", name, id),
        SyncEvent::Planned { nodes, batches, oversized, eta_secs } => {
            let mut line = format!(
                "uploading {} node(s) in {} batch(es), about {}",
                nodes,
                batches,
                format_duration(Duration::from_secs(*eta_secs))
            );
            if *oversized > 0 {
                line.push_str(&format!("; {} node(s) too large to send", oversized));
            }
            line
        }
        SyncEvent::NodeDropped(o) => format!(
            "skipped row {} ({:?}): request would be {} chars, limit {}",
            o.index + 1,
            o.name,
            o.envelope_chars,
            o.max_chars
        ),
        SyncEvent::BatchSent { batch, planned, nodes, nodes_sent } => {
            format!("[{}/{}] sent {} node(s), {} total", batch, planned, nodes, nodes_sent)
        }
    }
}

pub fn print_event(event: &SyncEvent, json: bool) {
    if json {
        print_json(event);
    } else {
        eprintln!("{}", event_line(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::OversizedNode;

    #[test]
    fn progress_lines() {
        let sent = SyncEvent::BatchSent { batch: 2, planned: 3, nodes: 100, nodes_sent: 200 };
        assert_eq!(event_line(&sent), "[2/3] sent 100 node(s), 200 total");
        let dropped = SyncEvent::NodeDropped(OversizedNode { index: 4, name: "big".into(), envelope_chars: 6001, max_chars: 5000 });
        assert!(event_line(&dropped).starts_with("skipped row 5 (\"big\")"));
    }

    #[test]
    fn events_serialize_with_tag() {
        let v = serde_json::to_value(SyncEvent::FieldsCreated { count: 2 }).unwrap();
        assert_eq!(v, serde_json::json!({"event": "fields_created", "count": 2}));
    }
}
