use std::path::PathBuf;

use catalog::Branch;
use clap::Parser;
use process::{Uploader, models::DEFAULT_CHUNK_SIZE, read_roster, report};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Roster exported as CSV with Name, RollNo, Section, Password, Semester
    roster: PathBuf,

    #[arg(long, default_value = "http://localhost:5000")]
    server: String,

    #[arg(long)]
    username: String,

    #[arg(long, env = "UPLOAD_PASSWORD")]
    password: String,

    /// Target branch; only read for super-admin accounts
    #[arg(long)]
    branch: Option<Branch>,

    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let rows = read_roster(&args.roster)?;
    println!("Loaded Rows: {}\n", rows.len());

    let uploader = Uploader::login(&args.server, &args.username, &args.password).await?;
    let summary = uploader
        .upload(&rows, args.branch, args.chunk_size)
        .await?;

    report(&summary);

    Ok(())
}
