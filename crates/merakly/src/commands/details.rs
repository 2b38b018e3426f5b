//! Client details for a set of networks.

use tabled::Tabled;

use merakly_core::{NetworkDetail, Session, cell_text};

use crate::cli::{DetailsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct DetailRow {
    #[tabled(rename = "Client MAC")]
    mac: String,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "First Seen")]
    first_seen: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "AP")]
    wap: String,
    #[tabled(rename = "Device")]
    device: String,
}

fn text(value: Option<&serde_json::Value>) -> String {
    value.map(|v| cell_text(v).into_owned()).unwrap_or_default()
}

impl From<&NetworkDetail> for DetailRow {
    fn from(d: &NetworkDetail) -> Self {
        Self {
            mac: d.client_mac.clone().unwrap_or_default(),
            user: d.client_user_id.clone().unwrap_or_default(),
            first_seen: text(d.client_timestamps.first_seen.as_ref()),
            last_seen: text(d.client_timestamps.last_seen.as_ref()),
            network: d.network_id.clone().unwrap_or_default(),
            wap: d.wap_name.clone().unwrap_or_default(),
            device: d.mr_device_name.clone().unwrap_or_default(),
        }
    }
}

pub async fn handle(
    session: &Session,
    args: DetailsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::sign_in(session, global).await?;
    let details = util::with_spinner(
        global,
        "Loading client details…",
        session.network_details(&args.networks),
    )
    .await?;

    let out = output::render_list(
        &global.output,
        &details,
        |d| DetailRow::from(d),
        |d| d.client_mac.clone().unwrap_or_default(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
