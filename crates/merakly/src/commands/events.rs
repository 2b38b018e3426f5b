//! Event loading, search, and sort.

use std::sync::Arc;

use serde::Serialize;

use merakly_core::{
    EventColumn, EventRecord, EventRow, EventTable, LoadOutcome, RowId, Session, SortDirection,
    SortFilterConfig, cell_text,
};

use crate::cli::{EventsArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Rows ────────────────────────────────────────────────────────────

/// Structured form of one row: its identity plus every record field.
#[derive(Serialize)]
struct EventOut<'a> {
    row_id: String,
    #[serde(flatten)]
    record: &'a EventRecord,
}

impl<'a> From<&'a EventRow> for EventOut<'a> {
    fn from(row: &'a EventRow) -> Self {
        Self {
            row_id: row.id.to_string(),
            record: &row.record,
        }
    }
}

fn detail(e: &EventOut<'_>) -> String {
    let fields = e
        .record
        .fields()
        .map(|(name, value)| (name.as_str(), cell_text(value).into_owned()));
    output::detail_lines(std::iter::once(("row_id", e.row_id.clone())).chain(fields))
}

/// Header label and record field of one grid column.
struct GridColumn {
    header: String,
    field: String,
}

fn grid_columns(config: &SortFilterConfig) -> Vec<GridColumn> {
    let mut columns: Vec<GridColumn> = EventColumn::all()
        .map(|c| GridColumn {
            header: c.header().to_owned(),
            field: c.field().to_owned(),
        })
        .collect();

    // Sorting by a field outside the fixed set shows it as a last column
    let extra = config
        .sort_key
        .as_deref()
        .filter(|key| !columns.iter().any(|c| c.field == *key));
    if let Some(key) = extra {
        columns.push(GridColumn {
            header: key.to_owned(),
            field: key.to_owned(),
        });
    }

    for column in &mut columns {
        if config.sort_key.as_deref() == Some(column.field.as_str()) {
            column.header = format!("{} {}", column.header, config.sort_direction.indicator());
        }
    }
    columns
}

/// Accept a fixed column name or any field present in the loaded events.
fn check_sort_key(key: &str, events: &[EventRow]) -> Result<(), CliError> {
    let known = key.parse::<EventColumn>().is_ok()
        || events.iter().any(|row| row.record.get(key).is_some());
    if known {
        return Ok(());
    }
    let fields: Vec<&str> = EventColumn::all().map(EventColumn::field).collect();
    Err(CliError::Validation {
        field: "sort".into(),
        reason: format!("unknown field '{key}'. Columns: {}", fields.join(", ")),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: EventsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !args.all_networks && args.networks.is_empty() {
        return Err(CliError::Validation {
            field: "network".into(),
            reason: "choose networks with --network <ID> (repeatable) or --all-networks".into(),
        });
    }
    let show = args.show.as_deref().map(str::parse::<RowId>).transpose()?;

    util::open_organization(session, &args.org, global).await?;

    let outcome = if args.all_networks {
        util::with_spinner(global, "Loading events…", session.select_all()).await?
    } else {
        let selection = args.networks.iter().cloned();
        util::with_spinner(global, "Loading events…", session.select_networks(selection)).await?
    };
    if outcome == LoadOutcome::Cleared {
        tracing::info!(org = %args.org, "organization has no networks");
    }

    let events: Arc<[EventRow]> = session
        .state()
        .events()
        .cloned()
        .unwrap_or_else(|| Arc::from(Vec::new()));

    if let Some(ref key) = args.sort {
        check_sort_key(key, &events)?;
    }

    let mut table = EventTable::with_config(SortFilterConfig {
        sort_key: args.sort,
        sort_direction: if args.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        },
        search_query: args.search.unwrap_or_default(),
    });
    table.set_events(events);

    // ── Single row ──
    if let Some(id) = show {
        let row = table.row(&id).ok_or_else(|| CliError::NotFound {
            resource_type: "event row".into(),
            identifier: id.to_string(),
            list_command: format!("events {} --network {}", args.org, id.network_id),
        })?;
        let out = output::render_single(
            &global.output,
            &EventOut::from(row),
            detail,
            |e| e.row_id.clone(),
        );
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    // ── Derived view ──
    let rows: Vec<EventOut<'_>> = table
        .view()
        .take(args.limit.unwrap_or(usize::MAX))
        .map(EventOut::from)
        .collect();

    let columns = grid_columns(table.config());
    let headers: Vec<String> = std::iter::once("Row".to_owned())
        .chain(columns.iter().map(|c| c.header.clone()))
        .collect();

    let out = output::render_grid(
        &global.output,
        &rows,
        &headers,
        |e| {
            std::iter::once(e.row_id.clone())
                .chain(columns.iter().map(|c| {
                    e.record
                        .get(&c.field)
                        .map(|v| cell_text(v).into_owned())
                        .unwrap_or_default()
                }))
                .collect::<Vec<_>>()
        },
        |e| e.row_id.clone(),
    );
    output::print_output(&out, global.quiet);

    if matches!(global.output, OutputFormat::Table) {
        let summary = if rows.len() < table.len() {
            format!(
                "Showing {} of {} matching events ({} loaded)",
                rows.len(),
                table.len(),
                table.total()
            )
        } else {
            format!("{} of {} events", table.len(), table.total())
        };
        output::print_status(&summary, &global.color, global.quiet);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    fn rows() -> Vec<EventRow> {
        let batch = vec![
            [("type", json!("association")), ("rssi", json!(41))]
                .into_iter()
                .collect::<EventRecord>(),
            [("type", json!("disassociation"))]
                .into_iter()
                .collect::<EventRecord>(),
        ];
        EventRow::from_batch("N_1", batch)
    }

    #[test]
    fn structured_row_flattens_record_fields() {
        let rows = rows();
        let value = serde_json::to_value(EventOut::from(&rows[0])).unwrap();
        assert_eq!(
            value,
            json!({ "row_id": "N_1#0", "type": "association", "rssi": 41 })
        );
    }

    #[test]
    fn detail_lists_fields_in_received_order() {
        let record: EventRecord =
            serde_json::from_str(r#"{"type":"association","occurred_at":"t1","band":"5"}"#)
                .unwrap();
        let rows = EventRow::from_batch("N_1", vec![record]);
        let card = detail(&EventOut::from(&rows[0]));
        let labels: Vec<&str> = card
            .lines()
            .filter_map(|line| line.split(':').next())
            .collect();
        assert_eq!(labels, vec!["row_id", "type", "occurred_at", "band"]);
    }

    #[test]
    fn sort_key_may_be_column_or_loaded_field() {
        let rows = rows();
        assert!(check_sort_key("occurred_at", &rows).is_ok());
        assert!(check_sort_key("rssi", &rows).is_ok());
        assert!(matches!(
            check_sort_key("nope", &rows),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn sorted_column_carries_indicator() {
        let config = SortFilterConfig {
            sort_key: Some("type".into()),
            sort_direction: SortDirection::Descending,
            search_query: String::new(),
        };
        let columns = grid_columns(&config);
        assert_eq!(columns.len(), EventColumn::all().count());
        assert!(columns.iter().any(|c| c.header == "Event Type ▼"));
    }

    #[test]
    fn extra_sort_field_becomes_last_column() {
        let config = SortFilterConfig {
            sort_key: Some("rssi".into()),
            ..SortFilterConfig::default()
        };
        let columns = grid_columns(&config);
        let last = columns.last().unwrap();
        assert_eq!(last.field, "rssi");
        assert_eq!(last.header, "rssi ▲");
    }
}
