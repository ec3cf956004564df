use std::{path::PathBuf, time::Instant};

use clap::Parser;
use env_logger::Env;
use household_assignment::{
    assignment::Assignment,
    config::{Config, Projection, Resolution, Year, YearInt},
    Age,
};
use log::info;

/// Assign synthetic people to synthetic households, one region at a time.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Region (LAD) codes to assign
    #[arg(required = true)]
    regions: Vec<String>,

    /// JSON model configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    year: Option<YearInt>,

    /// Abort on the first shortfall
    #[arg(long)]
    strict: bool,

    #[arg(long)]
    seed: Option<u64>,

    /// Persons strictly older than this are adults
    #[arg(long)]
    adult_age: Option<u32>,

    #[arg(long, value_enum)]
    projection: Option<Projection>,

    #[arg(long, value_enum)]
    person_resolution: Option<Resolution>,

    #[arg(long, value_enum)]
    household_resolution: Option<Resolution>,

    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long)]
    persistent_data_dir: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl Args {
    fn to_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        config.strict |= self.strict;
        if let Some(year) = self.year {
            config.year = Year(year);
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(adult_age) = self.adult_age {
            config.adult_age = Age(adult_age);
        }
        if let Some(projection) = self.projection {
            config.projection = projection;
        }
        if let Some(resolution) = self.person_resolution {
            config.person_resolution = resolution;
        }
        if let Some(resolution) = self.household_resolution {
            config.household_resolution = resolution;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.persistent_data_dir {
            config.persistent_data_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.to_config()?;
    info!("{config:?}");

    let start = Instant::now();
    for region in args.regions.iter() {
        info!(">>> Region: {region}");
        let mut assignment = Assignment::new(region, config.seed, &config)?;
        assignment.run()?;
        assignment.check();
        assignment.write()?;
        info!("Digest: {}", assignment.digest()?);
    }
    info!("Total execution time: {:.2?}", start.elapsed());
    Ok(())
}
