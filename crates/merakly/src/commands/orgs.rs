//! Organization listing.

use tabled::Tabled;

use merakly_core::{Organization, Session};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct OrgRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
}

impl From<&Organization> for OrgRow {
    fn from(o: &Organization) -> Self {
        Self {
            id: o.id.clone(),
            name: o.name.clone(),
            url: o
                .extra
                .get("url")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        }
    }
}

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    util::sign_in(session, global).await?;

    let state = session.state();
    let out = output::render_list(
        &global.output,
        state.organizations(),
        |o| OrgRow::from(o),
        |o| o.id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
