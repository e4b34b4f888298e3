use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use scrivener_mappings::remapper::Remapper;
use crate::config::{Config, LogLevel};
use crate::connect::ConnectSettings;
use crate::jar::Jar;
use crate::project::Project;
use crate::serve::ServeSettings;

mod config;
mod connect;
mod inspect;
mod jar;
mod logging;
mod project;
mod serve;
mod snapshot;

/// Rename the classes, methods, fields and parameters of obfuscated Java programs, together.
#[derive(Debug, Parser)]
#[command(name = "scrivener", version)]
struct Cli {
	/// Also log debug messages
	#[arg(short, long, global = true)]
	verbose: bool,

	/// Only log warnings and errors
	#[arg(long, global = true, conflicts_with = "verbose")]
	quiet: bool,

	#[arg(long, global = true, value_enum)]
	log_level: Option<LogLevel>,

	/// Also write the log into this file
	#[arg(long, global = true)]
	log_file: Option<PathBuf>,

	/// JSON config file, see `Config`
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

impl Cli {
	fn level(&self, config: &Config) -> LevelFilter {
		if self.verbose {
			LevelFilter::Debug
		} else if self.quiet {
			LevelFilter::Warn
		} else {
			self.log_level.unwrap_or(config.log_level).into()
		}
	}
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Host the mappings of a project for others to edit
	Serve {
		#[command(flatten)]
		project: ProjectArgs,

		#[arg(long)]
		port: Option<u16>,

		#[arg(long)]
		password: Option<String>,

		/// The jar to compute the checksum of, instead of the one of the project
		#[arg(long)]
		jar: Option<PathBuf>,

		/// Seconds between saving the mappings, `0` only saves when stopping
		#[arg(long)]
		autosave_secs: Option<u64>,
	},
	/// Connect to a server and print its mappings
	Connect {
		#[command(flatten)]
		project: ProjectArgs,

		#[arg(long)]
		address: String,

		#[arg(long)]
		port: Option<u16>,

		#[arg(long)]
		username: String,

		#[arg(long)]
		password: Option<String>,

		#[arg(long)]
		jar: Option<PathBuf>,

		/// Keep logging what others do, until ctrl-c
		#[arg(long)]
		follow: bool,
	},
	/// Print the deobfuscated names of entries, like `a/b/C.name(I)V`
	Translate {
		#[command(flatten)]
		project: ProjectArgs,

		#[arg(required = true)]
		entries: Vec<String>,
	},
	/// Print the packages with their classes
	Packages {
		#[command(flatten)]
		project: ProjectArgs,
	},
}

#[derive(Debug, Args)]
struct ProjectArgs {
	/// The project file
	#[arg(long)]
	project: PathBuf,
}

impl ProjectArgs {
	fn read(&self) -> Result<Project> {
		Project::read(&self.project)
	}

	fn remapper(&self) -> Result<Remapper> {
		let project = self.read()?;
		Ok(Remapper::new(Arc::new(project.index()?), project.read_mappings()?))
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	let config = Config::read_optional(cli.config.as_deref())?;
	logging::init(cli.level(&config), cli.log_file.as_deref())?;

	match cli.command {
		Command::Serve { project, port, password, jar, autosave_secs } => {
			let project = project.read()?;
			let autosave = match autosave_secs {
				Some(0) => None,
				Some(secs) => Some(Duration::from_secs(secs)),
				None => config.autosave_interval(),
			};
			let settings = ServeSettings {
				port: port.unwrap_or(config.port),
				password: password.unwrap_or(config.password),
				checksum: project.checksum(jar.map(Jar::new))?,
				login_timeout: Duration::from_secs(config.login_timeout_secs),
				autosave,
			};
			serve::serve(&project, settings).await
		},
		Command::Connect { project, address, port, username, password, jar, follow } => {
			let project = project.read()?;
			let settings = ConnectSettings {
				address,
				port: port.unwrap_or(config.port),
				username,
				password: password.unwrap_or(config.password),
				checksum: project.checksum(jar.map(Jar::new))?,
				follow,
			};
			connect::connect(&project, settings).await
		},
		Command::Translate { project, entries } => {
			for line in inspect::translate(&project.remapper()?, &entries)? {
				println!("{line}");
			}
			Ok(())
		},
		Command::Packages { project } => {
			for line in inspect::packages(&project.remapper()?) {
				println!("{line}");
			}
			Ok(())
		},
	}
}
