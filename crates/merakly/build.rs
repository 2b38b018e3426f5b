use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::Shell;

// cli.rs depends only on clap + clap_complete, both build-dependencies.
#[path = "src/cli.rs"]
mod cli;

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir: PathBuf = std::env::var_os("OUT_DIR")
        .ok_or_else(|| io::Error::other("OUT_DIR not set by Cargo"))?
        .into();

    let mut cmd = cli::Cli::command();
    cmd.build();

    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir)?;
    write_manpages(&cmd, &man_dir)?;

    let completion_dir = out_dir.join("completions");
    fs::create_dir_all(&completion_dir)?;
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, &mut cmd, "merakly", &completion_dir)?;
    }

    Ok(())
}

/// One page per visible command, named `merakly-<sub>-<sub>.1`.
fn write_manpages(root: &clap::Command, dir: &Path) -> io::Result<()> {
    let mut pending = vec![(root.get_name().to_owned(), root.clone())];

    while let Some((name, cmd)) = pending.pop() {
        for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
            let sub_name = format!("{name}-{}", sub.get_name());
            pending.push((sub_name.clone(), sub.clone().name(sub_name)));
        }

        let mut page = Vec::new();
        clap_mangen::Man::new(cmd).render(&mut page)?;
        fs::write(dir.join(format!("{name}.1")), page)?;
    }

    Ok(())
}
