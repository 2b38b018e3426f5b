//! Event table column catalogue.

use serde::Serialize;
use tabled::Tabled;

use merakly_core::EventColumn;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Clone, Copy, Serialize, Tabled)]
struct ColumnInfo {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Header")]
    header: &'static str,
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let columns: Vec<ColumnInfo> = EventColumn::all()
        .map(|c| ColumnInfo {
            field: c.field(),
            header: c.header(),
        })
        .collect();

    let out = output::render_list(&global.output, &columns, |c| *c, |c| c.field.to_owned());
    output::print_output(&out, global.quiet);
    Ok(())
}
