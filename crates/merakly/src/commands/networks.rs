//! Network listing for one organization.

use tabled::Tabled;

use merakly_core::{Network, Session};

use crate::cli::{GlobalOpts, NetworksArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct NetworkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Products")]
    products: String,
}

impl From<&Network> for NetworkRow {
    fn from(n: &Network) -> Self {
        Self {
            id: n.id.clone(),
            name: n.name.clone(),
            products: n.product_types.join(", "),
        }
    }
}

pub async fn handle(
    session: &Session,
    args: NetworksArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::open_organization(session, &args.org, global).await?;

    let state = session.state();
    let out = output::render_list(
        &global.output,
        state.networks(),
        |n| NetworkRow::from(n),
        |n| n.id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
