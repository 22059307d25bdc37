//! # Roster Upload
//!
//! Command line client for bulk student ingestion. Reads a CSV export of the
//! roster spreadsheet and feeds it to `POST /api/admin/upload-students`.
//!
//! 1. Log in as an admin and keep the bearer token
//! 2. Parse the roster, normalising the header row (`Roll No` → `RollNo`)
//! 3. Upload rows in chunks; the server processes each row independently
//! 4. Merge the per-chunk summaries, renumbering row errors so they point at
//!    the position in the whole file
use std::path::Path;

use anyhow::{Context, bail};
use catalog::{
    Branch,
    payloads::{IngestSummary, LoginRequest, LoginResponse, StudentRow, UploadRequest, UploadResponse},
};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, Response};

pub mod models;
pub mod utils;

use models::{ErrorBody, LOGIN_PATH, UPLOAD_PATH};
use utils::{parse_roster, renumber};

pub struct Uploader {
    client: Client,
    server: String,
    token: String,
}

async fn fail(response: Response) -> anyhow::Error {
    let status = response.status();

    match response.json::<ErrorBody>().await {
        Ok(body) => match body.error {
            Some(detail) => anyhow::anyhow!("{status}: {} ({detail})", body.msg),
            None => anyhow::anyhow!("{status}: {}", body.msg),
        },
        Err(_) => anyhow::anyhow!("{status}"),
    }
}

impl Uploader {
    pub async fn login(server: &str, username: &str, password: &str) -> anyhow::Result<Self> {
        let client = Client::new();
        let server = server.trim_end_matches('/').to_string();

        let response = client
            .post(format!("{server}{LOGIN_PATH}"))
            .json(&LoginRequest {
                roll_no: None,
                username: Some(username.to_string()),
                password: password.to_string(),
            })
            .send()
            .await
            .with_context(|| format!("could not reach {server}"))?;

        if !response.status().is_success() {
            return Err(fail(response).await.context("login failed"));
        }

        let login: LoginResponse = response.json().await?;
        if login.role == "student" {
            bail!("{username} is not an admin account");
        }

        println!("Logged in as {} ({})", login.name, login.role);

        Ok(Self {
            client,
            server,
            token: login.token,
        })
    }

    pub async fn upload_chunk(
        &self,
        rows: &[StudentRow],
        branch: Option<Branch>,
    ) -> anyhow::Result<IngestSummary> {
        let response = self
            .client
            .post(format!("{}{UPLOAD_PATH}", self.server))
            .bearer_auth(&self.token)
            .json(&UploadRequest {
                rows: rows.to_vec(),
                branch,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(fail(response).await);
        }

        let upload: UploadResponse = response.json().await?;
        Ok(upload.results)
    }

    pub async fn upload(
        &self,
        rows: &[StudentRow],
        branch: Option<Branch>,
        chunk_size: usize,
    ) -> anyhow::Result<IngestSummary> {
        let chunk_size = chunk_size.max(1);

        let pb = ProgressBar::new(rows.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("=> "),
        );

        let mut total = IngestSummary::default();

        for (index, chunk) in rows.chunks(chunk_size).enumerate() {
            let offset = index * chunk_size;
            pb.set_message(format!("Rows {}-{}", offset + 1, offset + chunk.len()));

            let mut summary = self
                .upload_chunk(chunk, branch)
                .await
                .with_context(|| format!("upload of rows starting at {} failed", offset + 1))?;

            summary.errors = summary
                .errors
                .iter()
                .map(|message| renumber(message, offset))
                .collect();
            total += summary;

            pb.inc(chunk.len() as u64);
        }

        pb.finish_with_message("Done");
        Ok(total)
    }
}

pub fn read_roster(path: &Path) -> anyhow::Result<Vec<StudentRow>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;

    parse_roster(&text)
}

pub fn report(summary: &IngestSummary) {
    println!("\nCreated: {}", summary.created);
    println!("Updated: {}", summary.updated);
    println!("Errors: {}", summary.errors.len());

    for error in &summary.errors {
        println!("  {error}");
    }
}
